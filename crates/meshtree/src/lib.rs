//! Meta crate re-exporting the meshtree layers. Depend on this crate and opt
//! into the layers you need through feature flags; the underlying crates stay
//! reachable for deeper integration.

#[cfg(feature = "common")]
pub use meshtree_common as common;

#[cfg(feature = "io")]
pub use meshtree_io as io;

#[cfg(feature = "engine")]
pub use meshtree_engine as engine;

#[cfg(feature = "engine")]
pub use meshtree_engine::{
    Category, Classification, DataObject, HierarchyGraph, OutputShape, Partition, Reader,
    ReaderConfig, StructuralWarning,
};

#[cfg(feature = "common")]
pub use meshtree_common::{Document, DocumentError};
