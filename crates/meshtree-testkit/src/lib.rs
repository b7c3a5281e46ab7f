//! Fixture helpers shared by the meshtree test suites: an in-memory document
//! builder and writers for description and raw array files.

use std::fs;
use std::path::{Path, PathBuf};

use meshtree_common::{
    ArrayRef, Attribute, CellType, Center, CollectionType, CurvilinearGrid, Document, Graph,
    GridParts, Item, ItemId, ItemKind, RectilinearGrid, RegularGrid, Set, SetType, Topology,
    UnstructuredGrid,
};

pub use tempfile::TempDir;

/// Builds documents item by item. Every method panics on misplaced items,
/// which is what a broken fixture should do.
#[derive(Debug, Default)]
pub struct DocBuilder {
    doc: Document,
}

impl DocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> ItemId {
        self.doc.root()
    }

    fn add(&mut self, parent: ItemId, item: Item) -> ItemId {
        self.doc
            .insert(parent, item)
            .unwrap_or_else(|e| panic!("fixture insert failed: {e}"))
    }

    pub fn collection(&mut self, parent: ItemId, name: &str, collection_type: CollectionType) -> ItemId {
        self.add(parent, Item::new(name, ItemKind::collection(collection_type)))
    }

    pub fn spatial(&mut self, parent: ItemId, name: &str) -> ItemId {
        self.collection(parent, name, CollectionType::Spatial)
    }

    pub fn temporal(&mut self, parent: ItemId, name: &str) -> ItemId {
        self.collection(parent, name, CollectionType::Temporal)
    }

    /// Regular grid with unit spacing at the origin.
    pub fn regular(&mut self, parent: ItemId, name: &str, dimensions: [usize; 3]) -> ItemId {
        self.add(
            parent,
            Item::new(
                name,
                ItemKind::RegularGrid(RegularGrid {
                    dimensions,
                    origin: [0.0; 3],
                    spacing: [1.0; 3],
                    parts: GridParts::default(),
                }),
            ),
        )
    }

    /// Rectilinear grid with axes `0, 1, ..` of the given point counts.
    pub fn rectilinear(&mut self, parent: ItemId, name: &str, dimensions: [usize; 3]) -> ItemId {
        let axes = dimensions
            .iter()
            .map(|&n| ArrayRef::scalars((0..n).map(|i| i as f64).collect()))
            .collect();
        self.add(
            parent,
            Item::new(
                name,
                ItemKind::RectilinearGrid(RectilinearGrid {
                    axes,
                    parts: GridParts::default(),
                }),
            ),
        )
    }

    /// Curvilinear grid laid out on the unit lattice.
    pub fn curvilinear(&mut self, parent: ItemId, name: &str, dimensions: [usize; 3]) -> ItemId {
        let mut points = Vec::new();
        for k in 0..dimensions[2] {
            for j in 0..dimensions[1] {
                for i in 0..dimensions[0] {
                    points.extend([i as f64, j as f64, k as f64]);
                }
            }
        }
        self.add(
            parent,
            Item::new(
                name,
                ItemKind::CurvilinearGrid(CurvilinearGrid {
                    dimensions,
                    points: ArrayRef::inline(3, points),
                    parts: GridParts::default(),
                }),
            ),
        )
    }

    /// Two triangles sharing an edge of the unit square.
    pub fn unstructured(&mut self, parent: ItemId, name: &str) -> ItemId {
        let points = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        self.add(
            parent,
            Item::new(
                name,
                ItemKind::UnstructuredGrid(UnstructuredGrid {
                    topology: Topology {
                        cell_type: CellType::Triangle,
                        connectivity: ArrayRef::scalars(vec![0.0, 1.0, 2.0, 0.0, 2.0, 3.0]),
                    },
                    points: ArrayRef::inline(3, points),
                    parts: GridParts::default(),
                }),
            ),
        )
    }

    /// Chain graph `0 -> 1 -> .. -> nodes-1`.
    pub fn graph(&mut self, parent: ItemId, name: &str, nodes: usize) -> ItemId {
        let edges = nodes.saturating_sub(1);
        self.add(
            parent,
            Item::new(
                name,
                ItemKind::Graph(Graph {
                    node_count: nodes,
                    sources: ArrayRef::scalars((0..edges).map(|i| i as f64).collect()),
                    targets: ArrayRef::scalars((1..=edges).map(|i| i as f64).collect()),
                    attributes: Vec::new(),
                }),
            ),
        )
    }

    pub fn attribute(&mut self, owner: ItemId, name: &str, center: Center, values: Vec<f64>) -> ItemId {
        self.attribute_with(owner, name, center, ArrayRef::scalars(values))
    }

    pub fn attribute_with(
        &mut self,
        owner: ItemId,
        name: &str,
        center: Center,
        values: ArrayRef,
    ) -> ItemId {
        self.add(owner, Item::new(name, ItemKind::Attribute(Attribute { center, values })))
    }

    pub fn set(&mut self, grid: ItemId, name: &str, set_type: SetType, indices: &[usize]) -> ItemId {
        self.add(
            grid,
            Item::new(
                name,
                ItemKind::Set(Set {
                    set_type,
                    indices: ArrayRef::scalars(indices.iter().map(|&i| i as f64).collect()),
                    attributes: Vec::new(),
                }),
            ),
        )
    }

    pub fn time(&mut self, id: ItemId, time: f64) -> &mut Self {
        self.doc.set_time(id, time);
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn build(self) -> Document {
        self.doc
    }
}

/// Write a JSON description into `dir` and return its path.
pub fn write_description(dir: &Path, name: &str, description: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(description)
        .unwrap_or_else(|e| panic!("fixture serialization failed: {e}"));
    fs::write(&path, text).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    path
}

/// Write little-endian `f64` values into `dir` and return the file path.
pub fn write_raw(dir: &Path, name: &str, values: &[f64]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(&path, bytes).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    path
}

/// Fresh temporary directory for file fixtures.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"))
}
