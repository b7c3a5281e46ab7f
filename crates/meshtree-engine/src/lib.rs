pub mod classify;
pub mod config;
pub mod convert;
pub mod dataset;
pub mod index;
pub mod materialize;
pub mod partition;
pub mod reader;
pub mod selection;
pub mod sil;
pub mod warning;

pub use classify::{Classification, OutputShape, WholeExtent, classify};
pub use config::ReaderConfig;
pub use convert::{Converter, StandardConverter};
pub use dataset::{
    Association, AttributeData, CellArray, Composite, CompositeKind, CurvilinearData, DataArray,
    DataObject, GraphData, ImageData, RectilinearData, UnstructuredData,
};
pub use index::{HierarchyIndex, IndexLimits, build_index};
pub use materialize::{MaterializeRequest, materialize};
pub use partition::{Partition, PartitionStrategy};
pub use reader::{Reader, ReaderStats};
pub use selection::{Category, SelectionIndex, Selections};
pub use sil::{EdgeKind, HierarchyGraph, HierarchySnapshot, SnapshotEdge};
pub use warning::StructuralWarning;

pub use meshtree_common::{Document, DocumentError, ItemId};
