//! Attempt counting and the final sum reduction
//!
//! Every worker counts its own leaf evaluations in an [`AttemptCounter`]. At
//! the end of the run each worker hands its count to a [`Contributor`], and
//! the coordinator folds all of them in [`ReductionRoot::reduce`].

use crate::channel::{Channel, ChannelBackend, Receiver, Sender};
use crate::error::{Error, Result};
use crate::message::{Contribution, Rank};
use crate::oracle::Fingerprint;
use tracing::{info, warn};

/// Default number of leaf evaluations between progress lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Per-worker count of leaf evaluations
#[derive(Debug)]
pub struct AttemptCounter {
    rank: Rank,
    count: u64,
    progress_interval: u64,
}

impl AttemptCounter {
    /// Counter for `rank`; a zero interval disables progress lines
    pub fn new(rank: Rank, progress_interval: u64) -> Self {
        Self {
            rank,
            count: 0,
            progress_interval,
        }
    }

    /// Record one leaf evaluation
    ///
    /// Emits a progress line whenever the count before this evaluation is a
    /// multiple of the interval, so the first leaf is always reported.
    pub fn record(&mut self, candidate: &str, fingerprint: &Fingerprint) {
        if self.progress_interval > 0 && self.count % self.progress_interval == 0 {
            info!(
                target: "hashsweep::progress",
                "[{}|{}] {} -> {}",
                self.rank,
                self.count,
                candidate,
                fingerprint
            );
        }
        self.count += 1;
    }

    /// Leaf evaluations so far
    pub fn get(&self) -> u64 {
        self.count
    }
}

/// Outcome of the sum reduction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionOutcome {
    /// Sum of every worker's attempt count
    pub total_attempts: u64,

    /// Password reported by any contributor (last one received wins)
    pub found: Option<String>,

    /// Workers that stopped on an error, with the reason
    pub failures: Vec<(Rank, String)>,
}

/// Handle through which one worker contributes to the reduction
pub struct Contributor {
    rank: Rank,
    tx: Sender<Contribution>,
}

impl Contributor {
    /// Rank this handle contributes for
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Hand over this worker's share; consumes the handle
    pub fn contribute(self, contribution: Contribution) -> Result<()> {
        debug_assert_eq!(contribution.rank, self.rank);
        self.tx.send(contribution)
    }
}

/// Receiving side of the reduction, owned by the coordinator
pub struct ReductionRoot {
    expected: usize,
    rx: Receiver<Contribution>,
}

impl ReductionRoot {
    /// Block until every rank has contributed and fold the results
    ///
    /// If contributors disappear without reporting, the channel disconnects
    /// and the missing ranks are returned as [`Error::WorkerLost`].
    pub fn reduce(self) -> Result<ReductionOutcome> {
        let mut outcome = ReductionOutcome::default();
        let mut seen = vec![false; self.expected];
        let mut received = 0;

        while received < self.expected {
            let contribution = match self.rx.recv() {
                Ok(c) => c,
                Err(_) => {
                    let missing = seen
                        .iter()
                        .enumerate()
                        .filter(|(_, s)| !**s)
                        .map(|(rank, _)| rank)
                        .collect();
                    return Err(Error::WorkerLost { missing });
                }
            };

            seen[contribution.rank] = true;
            received += 1;
            outcome.total_attempts += contribution.attempts;

            if let Some(reason) = contribution.failure {
                warn!(rank = contribution.rank, %reason, "worker reported failure");
                outcome.failures.push((contribution.rank, reason));
            }
            if contribution.found.is_some() {
                outcome.found = contribution.found;
            }
        }

        outcome.failures.sort_by_key(|(rank, _)| *rank);
        Ok(outcome)
    }
}

/// Build the reduction for a group of `num_workers`
pub fn sum_reduction(
    num_workers: usize,
    backend: ChannelBackend,
) -> (ReductionRoot, Vec<Contributor>) {
    let (tx, rx) = Channel::unbounded(backend);
    let contributors = (0..num_workers)
        .map(|rank| Contributor {
            rank,
            tx: tx.clone(),
        })
        .collect();

    (
        ReductionRoot {
            expected: num_workers,
            rx,
        },
        contributors,
    )
}
