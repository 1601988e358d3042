//! Worker group management
//!
//! The group wires a run together: one announcement topic, one sum
//! reduction rooted at rank 0, one alphabet slice per rank, and one thread
//! per worker.

use crate::broadcast::Topic;
use crate::channel::ChannelBackend;
use crate::coordinator::{AggregateReport, Coordinator};
use crate::error::{Error, Result};
use crate::metrics::{sum_reduction, DEFAULT_PROGRESS_INTERVAL};
use crate::oracle::HashOracle;
use crate::partition::{self, PartitionStrategy};
use crate::search::{CandidateBuffers, HeapBuffers, SearchSpec};
use crate::worker::{spawn, SearchWorker, WorkerConfig, WorkerHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Worker group configuration
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Number of workers in the group
    pub num_workers: usize,

    /// Configuration template for workers
    pub worker_config: WorkerConfig,

    /// Whether to pin worker `i` to core `i % cores`
    pub enable_cpu_affinity: bool,

    /// Leaf evaluations between progress lines (0 = off)
    pub progress_interval: u64,

    /// How the alphabet is split across ranks
    pub partition: PartitionStrategy,

    /// Channel implementation for announcements and the reduction
    pub channel_backend: ChannelBackend,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            worker_config: WorkerConfig::default(),
            enable_cpu_affinity: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            partition: PartitionStrategy::default(),
            channel_backend: ChannelBackend::default(),
        }
    }
}

impl GroupConfig {
    /// Create a new group configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers
    pub fn with_num_workers(mut self, num: usize) -> Self {
        self.num_workers = num;
        self
    }

    /// Enable CPU affinity pinning
    pub fn with_cpu_affinity(mut self, enable: bool) -> Self {
        self.enable_cpu_affinity = enable;
        self
    }

    /// Set the progress interval
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the partition strategy
    pub fn with_partition(mut self, partition: PartitionStrategy) -> Self {
        self.partition = partition;
        self
    }

    /// Set the channel backend
    pub fn with_channel_backend(mut self, backend: ChannelBackend) -> Self {
        self.channel_backend = backend;
        self
    }
}

/// A fixed-size group of search workers
pub struct WorkerGroup {
    config: GroupConfig,
    oracle: Arc<dyn HashOracle>,
    buffers: Arc<dyn CandidateBuffers>,
}

impl WorkerGroup {
    /// Create a group that hashes with `oracle`
    pub fn new(config: GroupConfig, oracle: Arc<dyn HashOracle>) -> Result<Self> {
        if config.num_workers == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be positive".to_string(),
            ));
        }
        Ok(Self {
            config,
            oracle,
            buffers: Arc::new(HeapBuffers),
        })
    }

    /// Give every worker its candidate storage from `buffers`
    pub fn with_buffers(mut self, buffers: Arc<dyn CandidateBuffers>) -> Self {
        self.buffers = buffers;
        self
    }

    /// Number of workers the group runs
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Search the whole space described by `spec` and report the result
    ///
    /// Blocks until every worker has exited.
    pub fn run(&self, spec: &SearchSpec) -> Result<AggregateReport> {
        let n = self.config.num_workers;
        let backend = self.config.channel_backend;
        let partitioner = self.config.partition.partitioner();

        info!(
            workers = n,
            alphabet = spec.alphabet().len(),
            length = spec.length(),
            space = spec.space_size(),
            "starting sweep"
        );

        let ranges = (0..n)
            .map(|rank| partition::assign(partitioner, spec.alphabet().len(), n, rank))
            .collect::<Result<Vec<_>>>()?;

        let started = Instant::now();
        let endpoints = Topic::endpoints(n, backend);
        let (root, contributors) = sum_reduction(n, backend);
        let mut coordinator = Some(Coordinator::new(started, root, n));

        let mut handles: Vec<WorkerHandle> = Vec::with_capacity(n);
        let mut spawn_error = None;
        for (((rank, broadcaster), contributor), range) in endpoints
            .into_iter()
            .enumerate()
            .zip(contributors)
            .zip(ranges)
        {
            debug!(rank, start = range.start, end = range.end, "assigned range");

            let mut worker_config = self.config.worker_config.clone();
            if self.config.enable_cpu_affinity {
                worker_config = worker_config.with_cpu_affinity(rank % num_cpus::get());
            }
            if let Some(name) = &self.config.worker_config.name {
                worker_config = worker_config.with_name(format!("{name}-{rank}"));
            }

            let worker = SearchWorker {
                rank,
                range,
                spec: spec.clone(),
                oracle: Arc::clone(&self.oracle),
                buffers: Arc::clone(&self.buffers),
                broadcaster,
                contributor,
                progress_interval: self.config.progress_interval,
                coordinator: if rank == 0 { coordinator.take() } else { None },
            };
            match spawn(worker, worker_config) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        // Endpoints and contributors of unspawned ranks are dropped by now,
        // so the workers already running can finish.
        if let Some(e) = spawn_error {
            return Err(abandon(handles, e));
        }

        let mut report = None;
        let mut first_error = None;
        for handle in handles {
            let rank = handle.rank();
            match handle.join() {
                Ok(Some(r)) => report = Some(r),
                Ok(None) => {}
                Err(e) => {
                    warn!(rank, error = %e, "worker exited with error");
                    if rank == 0 || first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match (report, first_error) {
            (Some(report), _) => Ok(report),
            (None, Some(e)) => Err(e),
            (None, None) => Err(Error::WorkerLost { missing: vec![0] }),
        }
    }
}

/// Wait for the workers that did start, then report why the group could not
fn abandon(handles: Vec<WorkerHandle>, error: Error) -> Error {
    warn!(started = handles.len(), error = %error, "could not start every worker");
    for handle in handles {
        let rank = handle.rank();
        if let Err(e) = handle.join() {
            debug!(rank, error = %e, "started worker exited with error");
        }
    }
    error
}
