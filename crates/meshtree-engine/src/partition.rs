#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How siblings are divided among ranks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartitionStrategy {
    /// Sibling `i` goes to rank `i % total`.
    RoundRobin,
    /// Rank `r` takes the range `[r*n/total, (r+1)*n/total)`; the last rank
    /// absorbs any remainder.
    Contiguous,
}

/// This process's share of a distributed read.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    pub rank: u32,
    pub total: u32,
}

impl Default for Partition {
    fn default() -> Self {
        Self::SERIAL
    }
}

impl Partition {
    pub const SERIAL: Partition = Partition { rank: 0, total: 1 };

    pub fn new(rank: u32, total: u32) -> Self {
        Self { rank, total }
    }

    /// Whether this rank owns sibling `index` of `count`. With no ranks
    /// configured (`total < 1`) everything is owned.
    pub fn owns(&self, strategy: PartitionStrategy, index: usize, count: usize) -> bool {
        if self.total < 1 {
            return true;
        }
        let total = self.total as usize;
        let rank = self.rank as usize;
        match strategy {
            PartitionStrategy::RoundRobin => index % total == rank,
            PartitionStrategy::Contiguous => {
                let start = rank * count / total;
                let end = (rank + 1) * count / total;
                index >= start && (index < end || (rank + 1 == total && index < count))
            }
        }
    }
}
