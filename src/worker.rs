//! Search workers
//!
//! A worker is an isolated thread that owns its copy of the search spec, its
//! candidates, its counter and its endpoints. It talks to the rest of the
//! group only through its [`Broadcaster`] and its reduction [`Contributor`].

use crate::broadcast::Broadcaster;
use crate::coordinator::{AggregateReport, Coordinator};
use crate::error::{Error, Result};
use crate::message::{Contribution, Rank};
use crate::metrics::Contributor;
use crate::oracle::HashOracle;
use crate::partition::WorkerRange;
use crate::search::{CandidateBuffers, SearchContext, SearchSpec, Signal};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Worker thread configuration
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Thread name (defaults to `sweep-worker-<rank>`)
    pub name: Option<String>,

    /// CPU core to pin this worker to (None = no pinning)
    pub cpu_affinity: Option<usize>,

    /// Stack size for the worker thread (None = default)
    pub stack_size: Option<usize>,
}

impl WorkerConfig {
    /// Create a new worker configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set CPU affinity
    pub fn with_cpu_affinity(mut self, cpu: usize) -> Self {
        self.cpu_affinity = Some(cpu);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}

/// Everything one worker owns for the duration of a run
pub struct SearchWorker {
    /// Rank within the group
    pub rank: Rank,
    /// First-character slice to search
    pub range: WorkerRange,
    /// This worker's own copy of the search spec
    pub spec: SearchSpec,
    /// Digest function
    pub oracle: Arc<dyn HashOracle>,
    /// Storage for new candidates
    pub buffers: Arc<dyn CandidateBuffers>,
    /// Announcement endpoint
    pub broadcaster: Broadcaster,
    /// Reduction handle
    pub contributor: Contributor,
    /// Leaf evaluations between progress lines (0 = off)
    pub progress_interval: u64,
    /// Present on rank 0 only
    pub coordinator: Option<Coordinator>,
}

impl SearchWorker {
    /// Search the assigned range, then take part in the reduction
    ///
    /// Returns the final report on the coordinating worker and `None` on
    /// every other rank.
    pub fn run(mut self) -> Result<Option<AggregateReport>> {
        debug!(
            rank = self.rank,
            start = self.range.start,
            end = self.range.end,
            "worker starting"
        );

        let (attempts, result) = {
            let mut ctx = SearchContext::new(
                &self.spec,
                self.oracle.as_ref(),
                &mut self.broadcaster,
                self.progress_interval,
            )
            .with_buffers(self.buffers.as_ref());
            let result = ctx.run(self.range);
            (ctx.attempts(), result)
        };

        let contribution = contribution_for(self.rank, attempts, result);
        let traffic = self.broadcaster.traffic();
        debug!(
            rank = self.rank,
            attempts,
            announced = traffic.delivered,
            unreachable = traffic.unreachable,
            received = traffic.received,
            unread = traffic.unread,
            "worker finished search"
        );

        match self.coordinator {
            Some(coordinator) => coordinator
                .finish(contribution, self.contributor, &self.broadcaster)
                .map(Some),
            None => {
                self.contributor.contribute(contribution)?;
                Ok(None)
            }
        }
    }
}

/// Turn a search result into this worker's reduction share
///
/// A failed search still contributes whatever it counted before failing.
pub fn contribution_for(rank: Rank, attempts: u64, result: Result<Signal>) -> Contribution {
    match result {
        Ok(signal) => Contribution::completed(rank, attempts, signal.into_password()),
        Err(e) => {
            warn!(rank, error = %e, "worker search failed");
            Contribution::failed(rank, attempts, e.to_string())
        }
    }
}

/// Handle for a running worker thread
pub struct WorkerHandle {
    rank: Rank,
    config: WorkerConfig,
    thread_handle: JoinHandle<Result<Option<AggregateReport>>>,
}

impl WorkerHandle {
    /// Rank of the worker
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Thread name of the worker
    pub fn name(&self) -> Option<&str> {
        self.config.name.as_deref()
    }

    /// Wait for the worker to exit
    pub fn join(self) -> Result<Option<AggregateReport>> {
        self.thread_handle
            .join()
            .map_err(|_| Error::WorkerPanicked(format!("worker {} panicked", self.rank)))?
    }
}

/// Start a worker on its own thread
pub fn spawn(worker: SearchWorker, config: WorkerConfig) -> Result<WorkerHandle> {
    let rank = worker.rank;
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("sweep-worker-{rank}"));

    let mut thread_builder = thread::Builder::new().name(name);
    if let Some(stack_size) = config.stack_size {
        thread_builder = thread_builder.stack_size(stack_size);
    }

    let cpu_affinity = config.cpu_affinity;
    let thread_handle = thread_builder
        .spawn(move || {
            if let Some(cpu) = cpu_affinity {
                pin_to_core(rank, cpu);
            }
            worker.run()
        })
        .map_err(|e| Error::Spawn {
            rank,
            reason: e.to_string(),
        })?;

    Ok(WorkerHandle {
        rank,
        config,
        thread_handle,
    })
}

fn pin_to_core(rank: Rank, cpu: usize) {
    let pinned = core_affinity::get_core_ids()
        .and_then(|ids| ids.get(cpu).copied())
        .map(core_affinity::set_for_current)
        .unwrap_or(false);

    if !pinned {
        debug!(rank, cpu, "could not pin worker to core");
    }
}
