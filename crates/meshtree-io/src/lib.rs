pub mod backends;
pub mod keeper;
pub mod traits;

#[cfg(feature = "json")]
pub use backends::JsonDescription;
pub use keeper::{ArrayKey, ArrayKeeper, ArraySlot, GenerationalKeeper, KeeperError, KeeperStats};
pub use traits::DocumentParser;

// Re-export for convenience
pub use meshtree_common::{Document, DocumentError};
