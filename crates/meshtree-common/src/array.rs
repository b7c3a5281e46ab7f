use std::path::{Path, PathBuf};

/// Where the values of a heavy array live.
///
/// Descriptions never hold loaded payloads for `Raw` sources; the bytes are
/// read on demand by an array keeper.
#[derive(Clone, Debug, PartialEq)]
pub enum ArraySource {
    /// Values embedded directly in the description.
    Inline(Vec<f64>),
    /// `count` little-endian `f64` values starting `offset` bytes into `path`.
    Raw {
        path: PathBuf,
        offset: u64,
        count: usize,
    },
}

/// Lightweight handle to a numeric array: shape plus source, no loaded data.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayRef {
    pub components: usize,
    pub source: ArraySource,
}

impl ArrayRef {
    pub fn inline(components: usize, values: Vec<f64>) -> Self {
        Self {
            components: components.max(1),
            source: ArraySource::Inline(values),
        }
    }

    pub fn scalars(values: Vec<f64>) -> Self {
        Self::inline(1, values)
    }

    pub fn raw(components: usize, path: impl Into<PathBuf>, offset: u64, count: usize) -> Self {
        Self {
            components: components.max(1),
            source: ArraySource::Raw {
                path: path.into(),
                offset,
                count,
            },
        }
    }

    /// Total number of scalar values, known without loading.
    pub fn len(&self) -> usize {
        match &self.source {
            ArraySource::Inline(values) => values.len(),
            ArraySource::Raw { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tuples (values / components).
    pub fn tuples(&self) -> usize {
        self.len() / self.components.max(1)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.source, ArraySource::Raw { .. })
    }

    /// Resolve a relative raw path against `base`; inline arrays are untouched.
    pub fn resolve_against(&mut self, base: &Path) {
        if let ArraySource::Raw { path, .. } = &mut self.source
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
    }
}
