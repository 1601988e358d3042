//! Run coordination and the final report
//!
//! Rank 0 carries a [`Coordinator`] next to its search. Once its own search
//! is over it contributes like every other worker, waits for the whole
//! group's contributions, drains any announcement that raced with the
//! reduction, and builds the one [`AggregateReport`] of the run.

use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::message::{Contribution, Rank};
use crate::metrics::{Contributor, ReductionRoot};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    /// Wall-clock time from dispatch to the end of the reduction
    pub elapsed: Duration,

    /// The recovered password, if any worker found it
    pub password: Option<String>,

    /// Leaf candidates evaluated across the whole group
    pub total_attempts: u64,

    /// Number of workers in the group
    pub num_workers: usize,

    /// Workers that stopped on an error
    pub failures: Vec<(Rank, String)>,
}

impl AggregateReport {
    /// Whether the password was recovered
    pub fn is_found(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Operation completed.")?;
        writeln!(f, "Total time elapsed: {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Total attempts: {}", self.total_attempts)?;
        for (rank, reason) in &self.failures {
            writeln!(f, "Worker {rank} failed: {reason}")?;
        }
        match &self.password {
            Some(password) => write!(f, "Recovered password: {password}"),
            None => write!(f, "FAILED to retrieve password!"),
        }
    }
}

/// Coordinator state, owned by rank 0
pub struct Coordinator {
    started: Instant,
    root: ReductionRoot,
    num_workers: usize,
}

impl Coordinator {
    /// Coordinator for a run dispatched at `started`
    pub fn new(started: Instant, root: ReductionRoot, num_workers: usize) -> Self {
        Self {
            started,
            root,
            num_workers,
        }
    }

    /// Contribute rank 0's share, reduce, and build the report
    ///
    /// Consumes the coordinator, so a run produces at most one report.
    pub fn finish(
        self,
        own: Contribution,
        contributor: Contributor,
        broadcaster: &Broadcaster,
    ) -> Result<AggregateReport> {
        contributor.contribute(own)?;
        let outcome = self.root.reduce()?;

        let late = broadcaster.poll_latest().map(|e| e.into_payload().password);
        let password = match (outcome.found, late) {
            (Some(found), Some(late)) if found != late => {
                debug!(%found, %late, "announcement after reduction disagrees, keeping reduced value");
                Some(found)
            }
            (found, late) => found.or(late),
        };

        let report = AggregateReport {
            elapsed: self.started.elapsed(),
            password,
            total_attempts: outcome.total_attempts,
            num_workers: self.num_workers,
            failures: outcome.failures,
        };

        info!(
            found = report.is_found(),
            attempts = report.total_attempts,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "sweep complete"
        );
        Ok(report)
    }
}
