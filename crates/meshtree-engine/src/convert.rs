//! Per-kind conversion from description items to in-memory datasets.

use std::sync::Arc;

use meshtree_common::{
    ArrayRef, Center, Document, DocumentError, ItemId, ItemKind, SetType,
};
use meshtree_io::{ArrayKey, ArrayKeeper, ArraySlot};
use rustc_hash::FxHashMap;

use crate::dataset::{
    Association, AttributeData, CellArray, CellPoints, CurvilinearData, DataArray, DataObject,
    GraphData, ImageData, RectilinearData, UnstructuredData,
};
use crate::selection::{Category, Selections};

/// Builds concrete datasets for atomic items. Every array read goes through
/// the keeper.
pub trait Converter {
    /// Geometry and topology only, no attribute arrays.
    fn copy_shape(
        &self,
        doc: &Document,
        node: ItemId,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<DataObject, DocumentError>;

    /// Shape plus every attribute enabled in `arrays`.
    fn populate(
        &self,
        doc: &Document,
        node: ItemId,
        arrays: &Selections,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<DataObject, DocumentError>;

    /// Unstructured subset of `source` (the populated `grid`) selected by `set`.
    fn extract_subset(
        &self,
        doc: &Document,
        set: ItemId,
        source: &DataObject,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<UnstructuredData, DocumentError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardConverter;

fn load(
    keeper: &mut dyn ArrayKeeper,
    item: ItemId,
    slot: ArraySlot,
    array: &ArrayRef,
) -> Result<Arc<[f64]>, DocumentError> {
    Ok(keeper.load(ArrayKey::new(item, slot), array)?)
}

fn to_indices(values: &[f64], what: &str) -> Result<Vec<usize>, DocumentError> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(DocumentError::structure(format!("{what}: invalid index {v}")))
            }
        })
        .collect()
}

fn extent_of(dims: [usize; 3]) -> [i64; 6] {
    let mut extent = [0i64; 6];
    for (axis, &n) in dims.iter().enumerate() {
        extent[2 * axis + 1] = n as i64 - 1;
    }
    extent
}

/// Where an attribute lands for an owner kind; `None` for unsupported centers.
fn association(center: Center, is_graph: bool) -> Option<(Association, Category)> {
    match (is_graph, center) {
        (_, Center::Grid) => Some((Association::Field, Category::FieldArrays)),
        (false, Center::Cell) | (true, Center::Edge) => {
            Some((Association::Cell, Category::CellArrays))
        }
        (_, Center::Node) => Some((Association::Point, Category::PointArrays)),
        _ => None,
    }
}

impl StandardConverter {
    pub fn new() -> Self {
        Self
    }

    fn attach_arrays(
        doc: &Document,
        node: ItemId,
        arrays: &Selections,
        keeper: &mut dyn ArrayKeeper,
        out: &mut AttributeData,
    ) -> Result<(), DocumentError> {
        let kind = &doc.item(node).kind;
        let is_graph = matches!(kind, ItemKind::Graph(_));
        for &attribute in kind.attributes() {
            let item = doc.item(attribute);
            let ItemKind::Attribute(attr) = &item.kind else {
                continue;
            };
            if item.name.is_empty() {
                continue;
            }
            let Some((association, category)) = association(attr.center, is_graph) else {
                continue;
            };
            if !arrays.get(category).is_enabled(&item.name) {
                continue;
            }
            let values = load(keeper, attribute, ArraySlot::Values, &attr.values)?;
            out.arrays_mut(association).push(DataArray::new(
                item.name.clone(),
                attr.values.components,
                values,
            ));
        }
        Ok(())
    }

    /// Attach a set's own attributes where their tuple counts fit the subset.
    fn attach_set_arrays(
        doc: &Document,
        set: ItemId,
        keeper: &mut dyn ArrayKeeper,
        out: &mut UnstructuredData,
    ) -> Result<(), DocumentError> {
        let points = out.number_of_points();
        let cells = out.cells.len();
        for &attribute in doc.item(set).kind.attributes() {
            let item = doc.item(attribute);
            let ItemKind::Attribute(attr) = &item.kind else {
                continue;
            };
            let (association, expected) = match attr.center {
                Center::Node => (Association::Point, Some(points)),
                Center::Cell => (Association::Cell, Some(cells)),
                Center::Grid => (Association::Field, None),
                _ => continue,
            };
            if item.name.is_empty() || expected.is_some_and(|n| n != attr.values.tuples()) {
                #[cfg(feature = "tracing")]
                tracing::debug!(attribute = %item.name, "set attribute does not fit its subset; skipping");
                continue;
            }
            let values = load(keeper, attribute, ArraySlot::Values, &attr.values)?;
            out.data.arrays_mut(association).push(DataArray::new(
                item.name.clone(),
                attr.values.components,
                values,
            ));
        }
        Ok(())
    }
}

impl Converter for StandardConverter {
    fn copy_shape(
        &self,
        doc: &Document,
        node: ItemId,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<DataObject, DocumentError> {
        let item = doc.item(node);
        let data = AttributeData::default();
        let object = match &item.kind {
            ItemKind::RegularGrid(grid) => DataObject::Image(ImageData {
                extent: extent_of(grid.dimensions),
                origin: grid.origin,
                spacing: grid.spacing,
                data,
            }),
            ItemKind::RectilinearGrid(grid) => {
                let mut coordinates: [Arc<[f64]>; 3] = std::array::from_fn(|_| Arc::from([0.0]));
                for (axis, array) in grid.axes.iter().enumerate().take(3) {
                    coordinates[axis] = load(keeper, node, ArraySlot::Axis(axis as u8), array)?;
                }
                DataObject::Rectilinear(RectilinearData {
                    extent: extent_of(grid.dimensions()),
                    coordinates,
                    data,
                })
            }
            ItemKind::CurvilinearGrid(grid) => DataObject::Curvilinear(CurvilinearData {
                extent: extent_of(grid.dimensions),
                points: load(keeper, node, ArraySlot::Points, &grid.points)?,
                data,
            }),
            ItemKind::UnstructuredGrid(grid) => {
                let points = load(keeper, node, ArraySlot::Points, &grid.points)?;
                let raw = load(
                    keeper,
                    node,
                    ArraySlot::Connectivity,
                    &grid.topology.connectivity,
                )?;
                let connectivity = to_indices(&raw, "connectivity")?;
                let per_cell = grid.topology.cell_type.point_count();
                if connectivity.len() % per_cell != 0 {
                    return Err(DocumentError::structure(format!(
                        "grid '{}': connectivity length {} is not a multiple of {per_cell}",
                        item.name,
                        connectivity.len()
                    )));
                }
                let mut cells = CellArray::new();
                for corners in connectivity.chunks_exact(per_cell) {
                    cells.push(grid.topology.cell_type, corners);
                }
                DataObject::Unstructured(UnstructuredData {
                    points,
                    cells,
                    data,
                })
            }
            ItemKind::Graph(graph) => {
                let sources = load(keeper, node, ArraySlot::EdgeSources, &graph.sources)?;
                let targets = load(keeper, node, ArraySlot::EdgeTargets, &graph.targets)?;
                let sources = to_indices(&sources, "graph sources")?;
                let targets = to_indices(&targets, "graph targets")?;
                DataObject::Graph(GraphData {
                    node_count: graph.node_count,
                    edges: sources.into_iter().zip(targets).collect(),
                    data,
                })
            }
            other => {
                return Err(DocumentError::structure(format!(
                    "a {} has no dataset shape",
                    other.label()
                )));
            }
        };
        Ok(object)
    }

    fn populate(
        &self,
        doc: &Document,
        node: ItemId,
        arrays: &Selections,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<DataObject, DocumentError> {
        let mut object = self.copy_shape(doc, node, keeper)?;
        if let Some(data) = object.data_mut() {
            Self::attach_arrays(doc, node, arrays, keeper, data)?;
        }
        Ok(object)
    }

    fn extract_subset(
        &self,
        doc: &Document,
        set: ItemId,
        source: &DataObject,
        keeper: &mut dyn ArrayKeeper,
    ) -> Result<UnstructuredData, DocumentError> {
        let set_item = doc.item(set);
        let ItemKind::Set(def) = &set_item.kind else {
            return Err(DocumentError::structure(format!(
                "'{}' is a {}, not a set",
                set_item.name,
                set_item.kind.label()
            )));
        };
        let raw = load(keeper, set, ArraySlot::Indices, &def.indices)?;
        let ids = to_indices(&raw, "set indices")?;
        let empty = AttributeData::default();
        let source_data = source.data().unwrap_or(&empty);

        let mut cells = CellArray::new();
        let (point_ids, cell_ids) = match def.set_type {
            SetType::Node => {
                let kept: Vec<usize> = ids
                    .into_iter()
                    .filter(|&id| source.point(id).is_some())
                    .collect();
                for local in 0..kept.len() {
                    cells.push(meshtree_common::CellType::Vertex, &[local]);
                }
                (kept, Vec::new())
            }
            SetType::Cell => {
                let mut remap: FxHashMap<usize, usize> = FxHashMap::default();
                let mut used = Vec::new();
                let mut kept = Vec::new();
                for id in ids {
                    let Some((cell_type, corners)) = source.cell(id) else {
                        continue;
                    };
                    let local: CellPoints = corners
                        .iter()
                        .map(|&p| {
                            *remap.entry(p).or_insert_with(|| {
                                used.push(p);
                                used.len() - 1
                            })
                        })
                        .collect();
                    cells.push(cell_type, &local);
                    kept.push(id);
                }
                (used, kept)
            }
        };

        let mut points = Vec::with_capacity(point_ids.len() * 3);
        for &p in &point_ids {
            let xyz = source.point(p).ok_or_else(|| {
                DocumentError::structure(format!("set '{}': point {p} out of range", set_item.name))
            })?;
            points.extend_from_slice(&xyz);
        }

        let data = AttributeData {
            field: source_data.field.clone(),
            cell: source_data.cell.iter().map(|a| a.gather(&cell_ids)).collect(),
            point: source_data.point.iter().map(|a| a.gather(&point_ids)).collect(),
        };
        let mut subset = UnstructuredData {
            points: Arc::from(points),
            cells,
            data,
        };
        if def.set_type == SetType::Node {
            subset.data.cell.clear();
        }
        Self::attach_set_arrays(doc, set, keeper, &mut subset)?;
        Ok(subset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtree_common::{Attribute, CellType, GridParts, Item, RegularGrid, Set};
    use meshtree_io::GenerationalKeeper;

    fn image_doc() -> (Document, ItemId, ItemId) {
        let mut doc = Document::new();
        let root = doc.root();
        let grid = doc
            .insert(
                root,
                Item::new(
                    "G",
                    ItemKind::RegularGrid(RegularGrid {
                        dimensions: [3, 3, 1],
                        origin: [0.0; 3],
                        spacing: [1.0; 3],
                        parts: GridParts::default(),
                    }),
                ),
            )
            .unwrap();
        doc.insert(
            grid,
            Item::new(
                "temp",
                ItemKind::Attribute(Attribute {
                    center: Center::Cell,
                    values: ArrayRef::scalars(vec![10.0, 11.0, 12.0, 13.0]),
                }),
            ),
        )
        .unwrap();
        doc.insert(
            grid,
            Item::new(
                "dist",
                ItemKind::Attribute(Attribute {
                    center: Center::Node,
                    values: ArrayRef::scalars((0..9).map(f64::from).collect()),
                }),
            ),
        )
        .unwrap();
        let set = doc
            .insert(
                grid,
                Item::new(
                    "corner",
                    ItemKind::Set(Set {
                        set_type: SetType::Cell,
                        indices: ArrayRef::scalars(vec![3.0]),
                        attributes: Vec::new(),
                    }),
                ),
            )
            .unwrap();
        (doc, grid, set)
    }

    fn all_arrays() -> Selections {
        let mut s = Selections::default();
        s.cells.add("temp");
        s.points.add("dist");
        s
    }

    #[test]
    fn populate_attaches_enabled_arrays_only() {
        let (doc, grid, _) = image_doc();
        let mut keeper = GenerationalKeeper::new();
        let mut arrays = all_arrays();
        arrays.points.set_enabled("dist", false);

        let out = StandardConverter.populate(&doc, grid, &arrays, &mut keeper).unwrap();
        let data = out.data().unwrap();
        assert!(data.get(Association::Cell, "temp").is_some());
        assert!(data.get(Association::Point, "dist").is_none());
        assert_eq!(out.extent(), Some([0, 2, 0, 2, 0, 0]));
    }

    #[test]
    fn cell_set_extracts_pixel_with_sampled_arrays() {
        let (doc, grid, set) = image_doc();
        let mut keeper = GenerationalKeeper::new();
        let source = StandardConverter
            .populate(&doc, grid, &all_arrays(), &mut keeper)
            .unwrap();
        let subset = StandardConverter
            .extract_subset(&doc, set, &source, &mut keeper)
            .unwrap();

        assert_eq!(subset.cells.len(), 1);
        let (t, corners) = subset.cells.cell(0).unwrap();
        assert_eq!(t, CellType::Pixel);
        assert_eq!(corners, &[0, 1, 2, 3]);
        assert_eq!(subset.number_of_points(), 4);
        assert_eq!(&subset.points[..3], &[1.0, 1.0, 0.0]);

        let temp = subset.data.get(Association::Cell, "temp").unwrap();
        assert_eq!(&*temp.values, &[13.0]);
        let dist = subset.data.get(Association::Point, "dist").unwrap();
        assert_eq!(&*dist.values, &[4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn invalid_indices_are_rejected() {
        assert!(to_indices(&[0.0, 2.0], "x").is_ok());
        assert!(to_indices(&[-1.0], "x").is_err());
        assert!(to_indices(&[1.5], "x").is_err());
    }
}
