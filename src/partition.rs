//! Partitioning of the alphabet across workers
//!
//! Each worker owns a contiguous slice of first characters. Deeper positions
//! always range over the whole alphabet, so slicing the first character is
//! enough to split the search space into disjoint subtrees.

use crate::error::{Error, Result};
use crate::message::Rank;
use serde::Deserialize;
use std::ops::Range;

/// Half-open interval `[start, end)` of alphabet indices owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRange {
    /// First index (inclusive)
    pub start: usize,
    /// Last index (exclusive)
    pub end: usize,
}

impl WorkerRange {
    /// Create a range, clamping an inverted interval to empty
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of first characters in the range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the worker has nothing to search
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The indices as a `Range`
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Strategy that assigns each rank its slice of the alphabet
pub trait Partitioner: Send + Sync {
    /// Range for `rank` when `alphabet_len` symbols are split over `num_workers`
    ///
    /// Callers must have validated `rank < num_workers`; see [`assign`].
    fn range_for(&self, alphabet_len: usize, num_workers: usize, rank: Rank) -> WorkerRange;
}

/// Validate the arguments and compute the range for one rank
pub fn assign(
    partitioner: &dyn Partitioner,
    alphabet_len: usize,
    num_workers: usize,
    rank: Rank,
) -> Result<WorkerRange> {
    if num_workers == 0 {
        return Err(Error::InvalidConfig("worker count must be positive".to_string()));
    }
    if rank >= num_workers {
        return Err(Error::InvalidConfig(format!(
            "rank {rank} outside group of {num_workers}"
        )));
    }
    Ok(partitioner.range_for(alphabet_len, num_workers, rank))
}

/// Equal slices of `⌊A/N⌋`, with the last rank absorbing the remainder
#[derive(Debug, Clone, Copy, Default)]
pub struct TailPartitioner;

impl Partitioner for TailPartitioner {
    fn range_for(&self, alphabet_len: usize, num_workers: usize, rank: Rank) -> WorkerRange {
        let count = alphabet_len / num_workers;
        let start = (rank * count).min(alphabet_len);

        if rank == num_workers - 1 {
            WorkerRange::new(start, alphabet_len)
        } else {
            WorkerRange::new(start, (start + count).min(alphabet_len))
        }
    }
}

/// Slices that differ by at most one, remainder spread over the first ranks
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadPartitioner;

impl Partitioner for SpreadPartitioner {
    fn range_for(&self, alphabet_len: usize, num_workers: usize, rank: Rank) -> WorkerRange {
        let count = alphabet_len / num_workers;
        let remainder = alphabet_len % num_workers;
        let start = rank * count + rank.min(remainder);
        let len = count + usize::from(rank < remainder);

        WorkerRange::new(start, start + len)
    }
}

/// Partitioning strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStrategy {
    /// [`TailPartitioner`]
    #[default]
    Tail,
    /// [`SpreadPartitioner`]
    Spread,
}

impl PartitionStrategy {
    /// The partitioner implementing this strategy
    pub fn partitioner(self) -> &'static dyn Partitioner {
        match self {
            PartitionStrategy::Tail => &TailPartitioner,
            PartitionStrategy::Spread => &SpreadPartitioner,
        }
    }
}

impl std::str::FromStr for PartitionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tail" => Ok(PartitionStrategy::Tail),
            "spread" => Ok(PartitionStrategy::Spread),
            other => Err(Error::InvalidConfig(format!(
                "unknown partition strategy '{other}'"
            ))),
        }
    }
}
