//! Coordinator: owns the document, its index and the array keeper, and
//! serves discovery, classification and data requests.

use std::path::{Path, PathBuf};

use meshtree_common::{CollectionType, Document, DocumentError, Item, ItemKind};
use meshtree_io::{ArrayKeeper, DocumentParser, GenerationalKeeper, JsonDescription};

use crate::classify::{Classification, WholeExtent, classify};
use crate::config::ReaderConfig;
use crate::convert::{Converter, StandardConverter};
use crate::dataset::{Composite, CompositeKind, DataObject};
use crate::index::{HierarchyIndex, build_index};
use crate::materialize::{MaterializeRequest, materialize};
use crate::partition::Partition;
use crate::selection::{Category, SelectionIndex};
use crate::sil::HierarchyGraph;
use crate::warning::StructuralWarning;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReaderStats {
    /// Completed document loads.
    pub discoveries: u64,
    /// Classifier runs (cached between loads).
    pub classifications: u64,
    pub materializations: u64,
    /// Advances whenever a new hierarchy graph is published.
    pub hierarchy_stamp: u64,
}

struct Loaded {
    document: Document,
    index: HierarchyIndex,
    classification: Option<Classification>,
}

pub struct Reader<
    P: DocumentParser = JsonDescription,
    K: ArrayKeeper = GenerationalKeeper,
    C: Converter = StandardConverter,
> {
    config: ReaderConfig,
    parser: P,
    keeper: K,
    converter: C,
    file_names: Vec<PathBuf>,
    as_time_series: bool,
    state: Option<Loaded>,
    stats: ReaderStats,
}

impl Reader {
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_parts(
            config,
            JsonDescription::new(),
            GenerationalKeeper::new(),
            StandardConverter::new(),
        )
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

/// Greatest known time not above `t`, or the first time when `t` precedes
/// them all. `times` is sorted and non-empty.
fn snap_to_floor(times: &[f64], t: f64) -> f64 {
    let after = times.partition_point(|&x| x <= t);
    times[after.saturating_sub(1)]
}

fn whole_extent(shape: &DataObject) -> WholeExtent {
    match shape {
        DataObject::Image(image) => WholeExtent {
            extent: image.extent,
            origin: image.origin,
            spacing: image.spacing,
        },
        other => WholeExtent {
            extent: other.extent().unwrap_or(WholeExtent::default().extent),
            ..WholeExtent::default()
        },
    }
}

fn unwrap_single_block(object: DataObject) -> DataObject {
    match object {
        DataObject::Composite(c) if c.len() == 1 && c.get(0).is_some() => c
            .into_blocks()
            .into_iter()
            .flatten()
            .next()
            .unwrap_or_else(|| DataObject::Composite(Composite::new(CompositeKind::MultiBlock))),
        other => other,
    }
}

impl<P: DocumentParser, K: ArrayKeeper, C: Converter> Reader<P, K, C> {
    pub fn with_parts(config: ReaderConfig, parser: P, keeper: K, converter: C) -> Self {
        Self {
            config,
            parser,
            keeper,
            converter,
            file_names: Vec::new(),
            as_time_series: config.file_series_as_time,
            state: None,
            stats: ReaderStats::default(),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub fn keeper(&self) -> &K {
        &self.keeper
    }

    pub fn file_names(&self) -> &[PathBuf] {
        &self.file_names
    }

    pub fn is_discovered(&self) -> bool {
        self.state.is_some()
    }

    /// Replace the file list; a different list drops the loaded document.
    pub fn set_file_names<T: AsRef<Path>>(&mut self, paths: &[T]) {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        if paths != self.file_names {
            self.reset();
            self.file_names = paths;
        }
    }

    /// Drop the document, its index and every cached array.
    pub fn reset(&mut self) {
        if self.state.take().is_some() {
            self.keeper.release(true);
        }
        self.file_names.clear();
    }

    /// Discover using the configured file-series interpretation.
    pub fn open<T: AsRef<Path>>(&mut self, paths: &[T]) -> Result<(), DocumentError> {
        self.discover(paths, self.config.file_series_as_time)
    }

    /// Parse and index `paths`. A repeated call with the same inputs is a
    /// no-op; a failed call leaves the previous state in place.
    pub fn discover<T: AsRef<Path>>(
        &mut self,
        paths: &[T],
        as_time_series: bool,
    ) -> Result<(), DocumentError> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        if self.state.is_some() && paths == self.file_names && as_time_series == self.as_time_series
        {
            return Ok(());
        }

        let mut document = self.load(&paths, as_time_series)?;
        let index = build_index(&mut document, self.config.partition, self.config.limits);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            files = paths.len(),
            blocks = index.selections.blocks.len(),
            times = index.times().len(),
            degraded = index.is_degraded(),
            "document discovered"
        );

        if self.state.is_some() {
            self.keeper.release(true);
        }
        self.file_names = paths;
        self.as_time_series = as_time_series;
        self.state = Some(Loaded {
            document,
            index,
            classification: None,
        });
        self.stats.discoveries += 1;
        self.stats.hierarchy_stamp += 1;
        Ok(())
    }

    fn read_one(&self, path: &Path) -> Result<Document, DocumentError> {
        if !self.parser.can_read(path) {
            return Err(DocumentError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.parser.read(path)
    }

    fn load(&self, paths: &[PathBuf], as_time_series: bool) -> Result<Document, DocumentError> {
        match paths {
            [] => Err(DocumentError::NoFileName),
            [single] => self.read_one(single),
            many => {
                let mut document = Document::new();
                let root = document.root();
                let collection_type = if as_time_series {
                    CollectionType::Temporal
                } else {
                    CollectionType::Spatial
                };
                let top = document.insert(root, Item::new("", ItemKind::collection(collection_type)))?;
                for path in many {
                    let part = self.read_one(path)?;
                    document.graft(part, top)?;
                }
                Ok(document)
            }
        }
    }

    /// Output shape of the loaded document, computed once per load.
    pub fn classify(&mut self) -> Result<&Classification, DocumentError> {
        let state = self.state.as_mut().ok_or(DocumentError::NotDiscovered)?;
        if state.classification.is_none() {
            let mut classification = classify(&state.document);
            if classification.shape.is_structured()
                && let Some(representative) = classification.representative
            {
                let shape =
                    self.converter
                        .copy_shape(&state.document, representative, &mut self.keeper)?;
                classification.extent = Some(whole_extent(&shape));
            }
            state.classification = Some(classification);
            self.stats.classifications += 1;
        }
        state
            .classification
            .as_ref()
            .ok_or(DocumentError::NotDiscovered)
    }

    pub fn document(&self) -> Option<&Document> {
        self.state.as_ref().map(|s| &s.document)
    }

    pub fn hierarchy_index(&self) -> Option<&HierarchyIndex> {
        self.state.as_ref().map(|s| &s.index)
    }

    pub fn hierarchy(&self) -> Option<&HierarchyGraph> {
        self.state.as_ref().map(|s| &s.index.hierarchy)
    }

    /// Distinct time values, ascending; empty before discovery.
    pub fn time_values(&self) -> &[f64] {
        self.state.as_ref().map(|s| s.index.times()).unwrap_or(&[])
    }

    pub fn warnings(&self) -> &[StructuralWarning] {
        self.state.as_ref().map(|s| s.index.warnings()).unwrap_or(&[])
    }

    pub fn selection(&self, category: Category) -> Option<&SelectionIndex> {
        self.state.as_ref().map(|s| s.index.selections.get(category))
    }

    pub fn selection_mut(&mut self, category: Category) -> Option<&mut SelectionIndex> {
        self.state
            .as_mut()
            .map(|s| s.index.selections.get_mut(category))
    }

    pub fn count(&self, category: Category) -> usize {
        self.selection(category).map_or(0, SelectionIndex::len)
    }

    pub fn name_at(&self, category: Category, index: usize) -> Option<&str> {
        self.selection(category)?.name_at(index)
    }

    pub fn is_enabled(&self, category: Category, name: &str) -> bool {
        self.selection(category)
            .is_some_and(|s| s.is_enabled(name))
    }

    pub fn set_enabled(&mut self, category: Category, name: &str, on: bool) {
        if let Some(selection) = self.selection_mut(category) {
            selection.set_enabled(name, on);
        }
    }

    /// Build the output for `partition` at `time` from the current
    /// selections.
    pub fn materialize(
        &mut self,
        partition: Partition,
        time: Option<f64>,
        as_time_series: bool,
    ) -> Result<DataObject, DocumentError> {
        self.classify()?;
        let state = self.state.as_ref().ok_or(DocumentError::NotDiscovered)?;
        // Arrays unused by the previous request go now.
        self.keeper.release(false);
        self.keeper.bump_generation();

        let times = state.index.times();
        let time = match time {
            Some(t) if !times.is_empty() => Some(if self.config.snap_time_to_floor {
                snap_to_floor(times, t)
            } else {
                t
            }),
            _ => None,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rank = partition.rank,
            total = partition.total,
            time = ?time,
            "materializing"
        );

        let request = MaterializeRequest {
            selections: &state.index.selections,
            partition,
            time,
            as_time_series,
        };
        let root = state.document.root();
        let output = materialize(
            &state.document,
            root,
            &request,
            &self.converter,
            &mut self.keeper,
        )?;
        self.stats.materializations += 1;

        let output =
            output.unwrap_or_else(|| DataObject::Composite(Composite::new(CompositeKind::MultiBlock)));
        Ok(unwrap_single_block(output))
    }
}

impl<P: DocumentParser, K: ArrayKeeper, C: Converter> Drop for Reader<P, K, C> {
    fn drop(&mut self) {
        self.keeper.release(true);
    }
}
