//! Lazy, generation-tagged storage for heavy arrays.
//!
//! Every load tags its entry with the keeper's current generation. A
//! coordinator calls [`ArrayKeeper::release`] with `force = false` and then
//! [`ArrayKeeper::bump_generation`] before each request, so arrays untouched
//! during the previous request are dropped while arrays it used survive one
//! more round. Loaded values are shared as `Arc<[f64]>`; outputs that still
//! hold an array keep it alive after the keeper lets go.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use meshtree_common::{ArrayRef, ArraySource, DocumentError, ItemId};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Which array of an item a key refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArraySlot {
    Values,
    Points,
    Connectivity,
    Axis(u8),
    Indices,
    EdgeSources,
    EdgeTargets,
}

/// Identity of a loaded array: owning item plus slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArrayKey {
    pub item: ItemId,
    pub slot: ArraySlot,
}

impl ArrayKey {
    pub fn new(item: ItemId, slot: ArraySlot) -> Self {
        Self { item, slot }
    }
}

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{count} values at offset {offset} do not fit in {}", .path.display())]
    OutOfRange {
        path: PathBuf,
        offset: u64,
        count: usize,
        available: u64,
    },
}

impl From<KeeperError> for DocumentError {
    fn from(err: KeeperError) -> Self {
        DocumentError::Array(Box::new(err))
    }
}

pub trait ArrayKeeper {
    /// Return the values behind `array`, loading them on first use.
    fn load(&mut self, key: ArrayKey, array: &ArrayRef) -> Result<Arc<[f64]>, KeeperError>;

    /// Drop entries older than the current generation, or all with `force`.
    fn release(&mut self, force: bool);

    fn bump_generation(&mut self);

    fn generation(&self) -> u64;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeeperStats {
    pub hits: u64,
    pub misses: u64,
    pub released: u64,
    pub bytes_read: u64,
}

#[derive(Debug)]
struct Entry {
    values: Arc<[f64]>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct GenerationalKeeper {
    entries: FxHashMap<ArrayKey, Entry>,
    generation: u64,
    stats: KeeperStats,
}

impl GenerationalKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &KeeperStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &ArrayKey) -> bool {
        self.entries.contains_key(key)
    }

    fn read_source(&mut self, array: &ArrayRef) -> Result<Arc<[f64]>, KeeperError> {
        match &array.source {
            ArraySource::Inline(values) => Ok(Arc::from(values.as_slice())),
            ArraySource::Raw {
                path,
                offset,
                count,
            } => {
                let wrap = |source| KeeperError::Read {
                    path: path.clone(),
                    source,
                };
                let mut file = File::open(path).map_err(wrap)?;
                let available = file
                    .metadata()
                    .map_err(wrap)?
                    .len()
                    .saturating_sub(*offset);
                let len = count
                    .checked_mul(8)
                    .filter(|&len| len as u64 <= available)
                    .ok_or_else(|| KeeperError::OutOfRange {
                        path: path.clone(),
                        offset: *offset,
                        count: *count,
                        available,
                    })?;
                file.seek(SeekFrom::Start(*offset)).map_err(wrap)?;
                let mut bytes = vec![0u8; len];
                file.read_exact(&mut bytes).map_err(wrap)?;
                self.stats.bytes_read += bytes.len() as u64;

                let values: Vec<f64> = bytes
                    .chunks_exact(8)
                    .map(|chunk| {
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(chunk);
                        f64::from_le_bytes(buf)
                    })
                    .collect();
                Ok(Arc::from(values))
            }
        }
    }
}

impl ArrayKeeper for GenerationalKeeper {
    fn load(&mut self, key: ArrayKey, array: &ArrayRef) -> Result<Arc<[f64]>, KeeperError> {
        let generation = self.generation;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.generation = generation;
            self.stats.hits += 1;
            return Ok(entry.values.clone());
        }
        let values = self.read_source(array)?;
        self.stats.misses += 1;
        self.entries.insert(
            key,
            Entry {
                values: values.clone(),
                generation,
            },
        );
        Ok(values)
    }

    fn release(&mut self, force: bool) {
        let before = self.entries.len();
        let current = self.generation;
        if force {
            self.entries.clear();
        } else {
            self.entries.retain(|_, e| e.generation >= current);
        }
        let dropped = before - self.entries.len();
        self.stats.released += dropped as u64;
        #[cfg(feature = "tracing")]
        if dropped > 0 {
            tracing::debug!(dropped, force, generation = current, "released cached arrays");
        }
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
