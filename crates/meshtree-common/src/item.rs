use std::fmt;

use crate::array::ArrayRef;
use crate::document::ItemId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collection semantics: spatial partitions or a sequence of timesteps.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionType {
    #[default]
    Spatial,
    Temporal,
}

/// Association of an attribute array with part of its owner.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Center {
    Node,
    Cell,
    Grid,
    Edge,
    Face,
    Other,
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Cell => "cell",
            Self::Grid => "grid",
            Self::Edge => "edge",
            Self::Face => "face",
            Self::Other => "other",
        })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetType {
    Node,
    Cell,
}

/// Fixed-size cell shapes. `Pixel`/`Voxel` are the axis-aligned cells of
/// structured grids.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    Vertex,
    Line,
    Triangle,
    Quadrilateral,
    Pixel,
    Tetrahedron,
    Pyramid,
    Wedge,
    Hexahedron,
    Voxel,
}

impl CellType {
    pub const fn point_count(self) -> usize {
        match self {
            CellType::Vertex => 1,
            CellType::Line => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral | CellType::Pixel | CellType::Tetrahedron => 4,
            CellType::Pyramid => 5,
            CellType::Wedge => 6,
            CellType::Hexahedron | CellType::Voxel => 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Topology {
    pub cell_type: CellType,
    /// Point ids, `cell_type.point_count()` per cell.
    pub connectivity: ArrayRef,
}

impl Topology {
    pub fn cell_count(&self) -> usize {
        self.connectivity.len() / self.cell_type.point_count()
    }
}

/// Attribute and set ids owned by a grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridParts {
    pub attributes: Vec<ItemId>,
    pub sets: Vec<ItemId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnstructuredGrid {
    pub topology: Topology,
    /// Interleaved xyz triples.
    pub points: ArrayRef,
    pub parts: GridParts,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RectilinearGrid {
    /// One coordinate array per axis (x, y, z); missing axes are flat.
    pub axes: Vec<ArrayRef>,
    pub parts: GridParts,
}

impl RectilinearGrid {
    pub fn dimensions(&self) -> [usize; 3] {
        let mut dims = [1; 3];
        for (slot, axis) in dims.iter_mut().zip(&self.axes) {
            *slot = axis.len().max(1);
        }
        dims
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurvilinearGrid {
    /// Point counts along x, y, z (x varies fastest).
    pub dimensions: [usize; 3],
    pub points: ArrayRef,
    pub parts: GridParts,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegularGrid {
    /// Point counts along x, y, z (x varies fastest).
    pub dimensions: [usize; 3],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub parts: GridParts,
}

/// Directed graph stored as parallel edge endpoint arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    pub node_count: usize,
    pub sources: ArrayRef,
    pub targets: ArrayRef,
    pub attributes: Vec<ItemId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub center: Center,
    pub values: ArrayRef,
}

/// Named subset of a grid's nodes or cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Set {
    pub set_type: SetType,
    pub indices: ArrayRef,
    pub attributes: Vec<ItemId>,
}

/// Child category of a domain or collection, in visitation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildCategory {
    Collection,
    Unstructured,
    Rectilinear,
    Curvilinear,
    Regular,
    Graph,
}

impl ChildCategory {
    pub const ORDER: [ChildCategory; 6] = [
        ChildCategory::Collection,
        ChildCategory::Unstructured,
        ChildCategory::Rectilinear,
        ChildCategory::Curvilinear,
        ChildCategory::Regular,
        ChildCategory::Graph,
    ];

    pub const ATOMIC: [ChildCategory; 5] = [
        ChildCategory::Unstructured,
        ChildCategory::Rectilinear,
        ChildCategory::Curvilinear,
        ChildCategory::Regular,
        ChildCategory::Graph,
    ];
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Children {
    pub collections: Vec<ItemId>,
    pub unstructured: Vec<ItemId>,
    pub rectilinear: Vec<ItemId>,
    pub curvilinear: Vec<ItemId>,
    pub regular: Vec<ItemId>,
    pub graphs: Vec<ItemId>,
}

impl Children {
    pub fn get(&self, category: ChildCategory) -> &[ItemId] {
        match category {
            ChildCategory::Collection => &self.collections,
            ChildCategory::Unstructured => &self.unstructured,
            ChildCategory::Rectilinear => &self.rectilinear,
            ChildCategory::Curvilinear => &self.curvilinear,
            ChildCategory::Regular => &self.regular,
            ChildCategory::Graph => &self.graphs,
        }
    }

    pub fn get_mut(&mut self, category: ChildCategory) -> &mut Vec<ItemId> {
        match category {
            ChildCategory::Collection => &mut self.collections,
            ChildCategory::Unstructured => &mut self.unstructured,
            ChildCategory::Rectilinear => &mut self.rectilinear,
            ChildCategory::Curvilinear => &mut self.curvilinear,
            ChildCategory::Regular => &mut self.regular,
            ChildCategory::Graph => &mut self.graphs,
        }
    }

    pub fn push(&mut self, category: ChildCategory, id: ItemId) {
        self.get_mut(category).push(id);
    }

    /// Every child id in visitation order.
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        ChildCategory::ORDER
            .into_iter()
            .flat_map(move |c| self.get(c).iter().copied())
    }

    pub fn len(&self) -> usize {
        ChildCategory::ORDER.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remap(&mut self, f: impl Fn(ItemId) -> ItemId) {
        for category in ChildCategory::ORDER {
            for id in self.get_mut(category) {
                *id = f(*id);
            }
        }
    }
}

/// Closed set of item kinds in a description.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    Domain(Children),
    GridCollection {
        collection_type: CollectionType,
        children: Children,
    },
    UnstructuredGrid(UnstructuredGrid),
    RectilinearGrid(RectilinearGrid),
    CurvilinearGrid(CurvilinearGrid),
    RegularGrid(RegularGrid),
    Graph(Graph),
    Attribute(Attribute),
    Set(Set),
}

impl ItemKind {
    pub fn collection(collection_type: CollectionType) -> Self {
        ItemKind::GridCollection {
            collection_type,
            children: Children::default(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Domain(_) => "domain",
            ItemKind::GridCollection { .. } => "collection",
            ItemKind::UnstructuredGrid(_) => "unstructured grid",
            ItemKind::RectilinearGrid(_) => "rectilinear grid",
            ItemKind::CurvilinearGrid(_) => "curvilinear grid",
            ItemKind::RegularGrid(_) => "regular grid",
            ItemKind::Graph(_) => "graph",
            ItemKind::Attribute(_) => "attribute",
            ItemKind::Set(_) => "set",
        }
    }

    /// Slot a child of this kind takes in its parent's `Children`.
    pub fn child_category(&self) -> Option<ChildCategory> {
        match self {
            ItemKind::GridCollection { .. } => Some(ChildCategory::Collection),
            ItemKind::UnstructuredGrid(_) => Some(ChildCategory::Unstructured),
            ItemKind::RectilinearGrid(_) => Some(ChildCategory::Rectilinear),
            ItemKind::CurvilinearGrid(_) => Some(ChildCategory::Curvilinear),
            ItemKind::RegularGrid(_) => Some(ChildCategory::Regular),
            ItemKind::Graph(_) => Some(ChildCategory::Graph),
            ItemKind::Domain(_) | ItemKind::Attribute(_) | ItemKind::Set(_) => None,
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            ItemKind::Domain(children) | ItemKind::GridCollection { children, .. } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            ItemKind::Domain(children) | ItemKind::GridCollection { children, .. } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn collection_type(&self) -> Option<CollectionType> {
        match self {
            ItemKind::GridCollection {
                collection_type, ..
            } => Some(*collection_type),
            _ => None,
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.collection_type() == Some(CollectionType::Temporal)
    }

    pub fn grid_parts(&self) -> Option<&GridParts> {
        match self {
            ItemKind::UnstructuredGrid(g) => Some(&g.parts),
            ItemKind::RectilinearGrid(g) => Some(&g.parts),
            ItemKind::CurvilinearGrid(g) => Some(&g.parts),
            ItemKind::RegularGrid(g) => Some(&g.parts),
            _ => None,
        }
    }

    fn grid_parts_mut(&mut self) -> Option<&mut GridParts> {
        match self {
            ItemKind::UnstructuredGrid(g) => Some(&mut g.parts),
            ItemKind::RectilinearGrid(g) => Some(&mut g.parts),
            ItemKind::CurvilinearGrid(g) => Some(&mut g.parts),
            ItemKind::RegularGrid(g) => Some(&mut g.parts),
            _ => None,
        }
    }

    /// Attribute ids owned by a grid, graph or set.
    pub fn attributes(&self) -> &[ItemId] {
        match self {
            ItemKind::Graph(g) => &g.attributes,
            ItemKind::Set(s) => &s.attributes,
            other => other
                .grid_parts()
                .map(|p| p.attributes.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match self {
            ItemKind::Graph(g) => Some(&mut g.attributes),
            ItemKind::Set(s) => Some(&mut s.attributes),
            other => other.grid_parts_mut().map(|p| &mut p.attributes),
        }
    }

    pub fn sets(&self) -> &[ItemId] {
        self.grid_parts().map(|p| p.sets.as_slice()).unwrap_or(&[])
    }

    pub fn sets_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        self.grid_parts_mut().map(|p| &mut p.sets)
    }

    pub(crate) fn remap_ids(&mut self, f: impl Fn(ItemId) -> ItemId + Copy) {
        if let Some(children) = self.children_mut() {
            children.remap(f);
        }
        if let Some(attrs) = self.attributes_mut() {
            for id in attrs.iter_mut() {
                *id = f(*id);
            }
        }
        if let Some(sets) = self.sets_mut() {
            for id in sets.iter_mut() {
                *id = f(*id);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub name: String,
    pub time: Option<f64>,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            time: None,
            kind,
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }
}
