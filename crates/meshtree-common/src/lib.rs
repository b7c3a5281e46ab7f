pub mod array;
pub mod document;
pub mod error;
pub mod item;

pub use array::*;
pub use document::*;
pub use error::*;
pub use item::*;
