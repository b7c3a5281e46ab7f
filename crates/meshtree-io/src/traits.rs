use std::io::Read;
use std::path::Path;

use meshtree_common::{Document, DocumentError};

/// Turns a description into the item graph.
///
/// Parsers only build structure; heavy arrays stay as [`meshtree_common::ArrayRef`]
/// handles and are loaded later through an array keeper.
pub trait DocumentParser {
    /// Cheap check used before a read is attempted.
    fn can_read(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Document, DocumentError>;

    /// Parse an in-memory description. Relative raw array paths resolve
    /// against `base_dir` when given.
    fn read_bytes(&self, bytes: &[u8], base_dir: Option<&Path>) -> Result<Document, DocumentError>;

    fn read_from(
        &self,
        mut reader: Box<dyn Read + Send>,
        base_dir: Option<&Path>,
    ) -> Result<Document, DocumentError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.read_bytes(&bytes, base_dir)
    }
}
