//! In-memory outputs produced by materialization.

use std::sync::Arc;

use meshtree_common::CellType;
use smallvec::SmallVec;

use crate::classify::OutputShape;

/// Corner point ids of one cell.
pub type CellPoints = SmallVec<[usize; 8]>;

#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub values: Arc<[f64]>,
}

impl DataArray {
    pub fn new(name: impl Into<String>, components: usize, values: Arc<[f64]>) -> Self {
        Self {
            name: name.into(),
            components: components.max(1),
            values,
        }
    }

    pub fn tuples(&self) -> usize {
        self.values.len() / self.components
    }

    pub fn tuple(&self, index: usize) -> Option<&[f64]> {
        let start = index * self.components;
        self.values.get(start..start + self.components)
    }

    /// New array holding the tuples at `ids`; out-of-range ids are skipped.
    pub fn gather(&self, ids: &[usize]) -> DataArray {
        let mut values = Vec::with_capacity(ids.len() * self.components);
        for &id in ids {
            if let Some(t) = self.tuple(id) {
                values.extend_from_slice(t);
            }
        }
        DataArray::new(self.name.clone(), self.components, Arc::from(values))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Association {
    Field,
    Cell,
    Point,
}

/// Arrays attached to a dataset, by association.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeData {
    pub field: Vec<DataArray>,
    pub cell: Vec<DataArray>,
    pub point: Vec<DataArray>,
}

impl AttributeData {
    pub fn arrays(&self, association: Association) -> &[DataArray] {
        match association {
            Association::Field => &self.field,
            Association::Cell => &self.cell,
            Association::Point => &self.point,
        }
    }

    pub fn arrays_mut(&mut self, association: Association) -> &mut Vec<DataArray> {
        match association {
            Association::Field => &mut self.field,
            Association::Cell => &mut self.cell,
            Association::Point => &mut self.point,
        }
    }

    pub fn get(&self, association: Association, name: &str) -> Option<&DataArray> {
        self.arrays(association).iter().find(|a| a.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty() && self.cell.is_empty() && self.point.is_empty()
    }
}

/// Cells of mixed type in offset/connectivity form.
#[derive(Clone, Debug, PartialEq)]
pub struct CellArray {
    types: Vec<CellType>,
    offsets: Vec<usize>,
    connectivity: Vec<usize>,
}

impl Default for CellArray {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            offsets: vec![0],
            connectivity: Vec::new(),
        }
    }
}

impl CellArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell_type: CellType, points: &[usize]) {
        self.types.push(cell_type);
        self.connectivity.extend_from_slice(points);
        self.offsets.push(self.connectivity.len());
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<(CellType, &[usize])> {
        let cell_type = *self.types.get(index)?;
        let start = self.offsets[index];
        let end = self.offsets[index + 1];
        Some((cell_type, &self.connectivity[start..end]))
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }
}

fn extent_dimensions(extent: &[i64; 6]) -> [usize; 3] {
    let mut dims = [0usize; 3];
    for (axis, dim) in dims.iter_mut().enumerate() {
        *dim = (extent[2 * axis + 1] - extent[2 * axis] + 1).max(0) as usize;
    }
    dims
}

fn structured_point_count(dims: [usize; 3]) -> usize {
    dims.iter().product()
}

fn structured_cell_count(dims: [usize; 3]) -> usize {
    if dims.contains(&0) {
        return 0;
    }
    dims.iter().map(|&n| if n > 1 { n - 1 } else { 1 }).product()
}

fn ijk(id: usize, dims: [usize; 3]) -> [usize; 3] {
    [id % dims[0], (id / dims[0]) % dims[1], id / (dims[0] * dims[1])]
}

/// Corners of a structured cell; pixel/voxel ordering, x varying fastest.
fn structured_cell(dims: [usize; 3], id: usize) -> Option<(CellType, CellPoints)> {
    if id >= structured_cell_count(dims) {
        return None;
    }
    let active = dims.map(|n| usize::from(n > 1));
    let cells = dims.map(|n| if n > 1 { n - 1 } else { 1 });
    let [i, j, k] = ijk(id, cells);
    let cell_type = match active.iter().sum::<usize>() {
        0 => CellType::Vertex,
        1 => CellType::Line,
        2 => CellType::Pixel,
        _ => CellType::Voxel,
    };
    let mut corners = CellPoints::new();
    for dk in 0..=active[2] {
        for dj in 0..=active[1] {
            for di in 0..=active[0] {
                corners.push((i + di) + (j + dj) * dims[0] + (k + dk) * dims[0] * dims[1]);
            }
        }
    }
    Some((cell_type, corners))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub extent: [i64; 6],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub data: AttributeData,
}

impl ImageData {
    pub fn dimensions(&self) -> [usize; 3] {
        extent_dimensions(&self.extent)
    }

    pub fn point(&self, id: usize) -> Option<[f64; 3]> {
        let dims = self.dimensions();
        if id >= structured_point_count(dims) {
            return None;
        }
        let index = ijk(id, dims);
        Some(std::array::from_fn(|a| {
            self.origin[a] + self.spacing[a] * (self.extent[2 * a] + index[a] as i64) as f64
        }))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RectilinearData {
    pub extent: [i64; 6],
    /// Coordinates along x, y, z.
    pub coordinates: [Arc<[f64]>; 3],
    pub data: AttributeData,
}

impl RectilinearData {
    pub fn dimensions(&self) -> [usize; 3] {
        extent_dimensions(&self.extent)
    }

    pub fn point(&self, id: usize) -> Option<[f64; 3]> {
        let dims = self.dimensions();
        if id >= structured_point_count(dims) {
            return None;
        }
        let index = ijk(id, dims);
        let mut out = [0.0; 3];
        for a in 0..3 {
            out[a] = self.coordinates[a].get(index[a]).copied().unwrap_or(0.0);
        }
        Some(out)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurvilinearData {
    pub extent: [i64; 6],
    /// Interleaved xyz triples.
    pub points: Arc<[f64]>,
    pub data: AttributeData,
}

impl CurvilinearData {
    pub fn dimensions(&self) -> [usize; 3] {
        extent_dimensions(&self.extent)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnstructuredData {
    pub points: Arc<[f64]>,
    pub cells: CellArray,
    pub data: AttributeData,
}

impl UnstructuredData {
    pub fn number_of_points(&self) -> usize {
        self.points.len() / 3
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphData {
    pub node_count: usize,
    pub edges: Vec<(usize, usize)>,
    /// Point data holds node arrays, cell data edge arrays.
    pub data: AttributeData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeKind {
    MultiBlock,
    /// Leaf collection whose slots are pieces of one dataset.
    MultiPiece,
}

/// Ordered slots; `None` marks a placeholder for a sibling owned by another
/// rank or filtered out by the request.
#[derive(Clone, Debug, PartialEq)]
pub struct Composite {
    pub kind: CompositeKind,
    blocks: Vec<Option<DataObject>>,
}

impl Composite {
    pub fn new(kind: CompositeKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: DataObject) {
        self.blocks.push(Some(block));
    }

    pub fn push_placeholder(&mut self) {
        self.blocks.push(None);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DataObject> {
        self.blocks.get(index).and_then(Option::as_ref)
    }

    pub fn blocks(&self) -> &[Option<DataObject>] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Option<DataObject>> {
        self.blocks
    }

    /// Live (non-placeholder) slots.
    pub fn live(&self) -> impl Iterator<Item = &DataObject> {
        self.blocks.iter().flatten()
    }

    /// Atomic datasets reachable through nested composites, depth first.
    pub fn leaves(&self) -> Vec<&DataObject> {
        let mut out = Vec::new();
        for block in self.live() {
            match block {
                DataObject::Composite(inner) => out.extend(inner.leaves()),
                other => out.push(other),
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DataObject {
    Composite(Composite),
    Image(ImageData),
    Rectilinear(RectilinearData),
    Curvilinear(CurvilinearData),
    Unstructured(UnstructuredData),
    Graph(GraphData),
}

impl DataObject {
    pub fn shape(&self) -> OutputShape {
        match self {
            DataObject::Composite(_) => OutputShape::Composite,
            DataObject::Image(_) => OutputShape::Image,
            DataObject::Rectilinear(_) => OutputShape::Rectilinear,
            DataObject::Curvilinear(_) => OutputShape::Curvilinear,
            DataObject::Unstructured(_) => OutputShape::Unstructured,
            DataObject::Graph(_) => OutputShape::DirectedGraph,
        }
    }

    pub fn data(&self) -> Option<&AttributeData> {
        match self {
            DataObject::Composite(_) => None,
            DataObject::Image(d) => Some(&d.data),
            DataObject::Rectilinear(d) => Some(&d.data),
            DataObject::Curvilinear(d) => Some(&d.data),
            DataObject::Unstructured(d) => Some(&d.data),
            DataObject::Graph(d) => Some(&d.data),
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut AttributeData> {
        match self {
            DataObject::Composite(_) => None,
            DataObject::Image(d) => Some(&mut d.data),
            DataObject::Rectilinear(d) => Some(&mut d.data),
            DataObject::Curvilinear(d) => Some(&mut d.data),
            DataObject::Unstructured(d) => Some(&mut d.data),
            DataObject::Graph(d) => Some(&mut d.data),
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            DataObject::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn extent(&self) -> Option<[i64; 6]> {
        match self {
            DataObject::Image(d) => Some(d.extent),
            DataObject::Rectilinear(d) => Some(d.extent),
            DataObject::Curvilinear(d) => Some(d.extent),
            _ => None,
        }
    }

    fn structured_dimensions(&self) -> Option<[usize; 3]> {
        self.extent().map(|e| extent_dimensions(&e))
    }

    pub fn number_of_points(&self) -> usize {
        match self {
            DataObject::Composite(c) => c.live().map(DataObject::number_of_points).sum(),
            DataObject::Unstructured(d) => d.number_of_points(),
            DataObject::Graph(d) => d.node_count,
            other => other
                .structured_dimensions()
                .map(structured_point_count)
                .unwrap_or(0),
        }
    }

    pub fn number_of_cells(&self) -> usize {
        match self {
            DataObject::Composite(c) => c.live().map(DataObject::number_of_cells).sum(),
            DataObject::Unstructured(d) => d.cells.len(),
            DataObject::Graph(d) => d.edges.len(),
            other => other
                .structured_dimensions()
                .map(structured_cell_count)
                .unwrap_or(0),
        }
    }

    /// Coordinates of point `id` of an atomic dataset.
    pub fn point(&self, id: usize) -> Option<[f64; 3]> {
        let triple = |points: &[f64]| {
            points
                .get(3 * id..3 * id + 3)
                .map(|p| [p[0], p[1], p[2]])
        };
        match self {
            DataObject::Image(d) => d.point(id),
            DataObject::Rectilinear(d) => d.point(id),
            DataObject::Curvilinear(d) => triple(&d.points[..]),
            DataObject::Unstructured(d) => triple(&d.points[..]),
            DataObject::Composite(_) | DataObject::Graph(_) => None,
        }
    }

    /// Type and corner point ids of cell `id` of an atomic dataset.
    pub fn cell(&self, id: usize) -> Option<(CellType, CellPoints)> {
        match self {
            DataObject::Unstructured(d) => d
                .cells
                .cell(id)
                .map(|(t, pts)| (t, CellPoints::from_slice(pts))),
            DataObject::Composite(_) | DataObject::Graph(_) => None,
            other => structured_cell(other.structured_dimensions()?, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(dims: [usize; 3]) -> DataObject {
        DataObject::Image(ImageData {
            extent: [
                0,
                dims[0] as i64 - 1,
                0,
                dims[1] as i64 - 1,
                0,
                dims[2] as i64 - 1,
            ],
            origin: [1.0, 0.0, 0.0],
            spacing: [0.5, 1.0, 1.0],
            data: AttributeData::default(),
        })
    }

    #[test]
    fn image_points_follow_origin_and_spacing() {
        let img = image([3, 2, 1]);
        assert_eq!(img.number_of_points(), 6);
        assert_eq!(img.number_of_cells(), 2);
        assert_eq!(img.point(4), Some([1.5, 1.0, 0.0]));
        assert_eq!(img.point(6), None);
    }

    #[test]
    fn planar_cells_are_pixels() {
        let img = image([3, 2, 1]);
        let (t, pts) = img.cell(1).unwrap();
        assert_eq!(t, CellType::Pixel);
        assert_eq!(pts.as_slice(), &[1, 2, 4, 5]);
        assert!(img.cell(2).is_none());
    }

    #[test]
    fn volume_cells_are_voxels() {
        let img = image([2, 2, 2]);
        let (t, pts) = img.cell(0).unwrap();
        assert_eq!(t, CellType::Voxel);
        assert_eq!(pts.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn cell_array_keeps_offsets() {
        let mut cells = CellArray::new();
        cells.push(CellType::Triangle, &[0, 1, 2]);
        cells.push(CellType::Vertex, &[7]);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells.cell(1), Some((CellType::Vertex, &[7][..])));
        assert_eq!(cells.cell(2), None);
    }

    #[test]
    fn gather_skips_out_of_range_tuples() {
        let a = DataArray::new("v", 2, Arc::from(vec![0.0, 1.0, 2.0, 3.0]));
        let g = a.gather(&[1, 5, 0]);
        assert_eq!(&*g.values, &[2.0, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn composite_leaves_skip_placeholders() {
        let mut inner = Composite::new(CompositeKind::MultiPiece);
        inner.push(image([2, 2, 1]));
        inner.push_placeholder();
        let mut outer = Composite::new(CompositeKind::MultiBlock);
        outer.push(DataObject::Composite(inner));
        outer.push(image([2, 1, 1]));
        assert_eq!(outer.len(), 2);
        assert_eq!(outer.leaves().len(), 2);
        assert_eq!(DataObject::Composite(outer).number_of_points(), 6);
    }
}
