#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::index::IndexLimits;
use crate::partition::Partition;

/// Reader-level settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReaderConfig {
    /// Rank used when discovering top-level collections.
    pub partition: Partition,

    /// Treat several files as timesteps rather than spatial pieces when
    /// opened through [`crate::Reader::open`].
    pub file_series_as_time: bool,

    pub limits: IndexLimits,

    /// Snap requested times down to the closest known step.
    pub snap_time_to_floor: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            partition: Partition::SERIAL,
            file_series_as_time: true,
            limits: IndexLimits::default(),
            snap_time_to_floor: true,
        }
    }
}

impl ReaderConfig {
    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_file_series_as_time(mut self, on: bool) -> Self {
        self.file_series_as_time = on;
        self
    }

    pub fn with_limits(mut self, limits: IndexLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.limits.max_vertices = max_vertices;
        self
    }

    pub fn with_degraded_depth(mut self, depth: u32) -> Self {
        self.limits.degraded_depth = depth;
        self
    }

    pub fn with_snap_time_to_floor(mut self, on: bool) -> Self {
        self.snap_time_to_floor = on;
        self
    }
}
