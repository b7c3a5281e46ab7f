use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by document discovery and materialization.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("no file name was given")]
    NoFileName,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {}: {message}", .path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<bytes>".to_string()))]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("document has not been discovered")]
    NotDiscovered,

    #[error("array load failed: {0}")]
    Array(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DocumentError {
    pub fn parse(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        DocumentError::Parse {
            path,
            message: message.into(),
        }
    }

    pub fn structure(message: impl Into<String>) -> Self {
        DocumentError::InvalidStructure(message.into())
    }
}
