//! # hashsweep
//!
//! Brute-force recovery of a fixed-length password from its digest, spread
//! over a group of shared-nothing workers.
//!
//! ## Key Features
//!
//! - **Exhaustive, bounded search**: every string of the target length over
//!   the chosen alphabet is hashed at most once by at most one worker
//! - **Zero-sharing by design**: each worker owns its candidates, counter and
//!   search state; peers only exchange messages
//! - **Early termination**: the worker that finds the password announces it
//!   and every peer stops at its next tree node
//! - **Exact accounting**: attempt counters are summed in a final reduction
//!
//! ## Architecture
//!
//! ```text
//!   alphabet [0, A)  ──partition──►  rank 0 │ rank 1 │ … │ rank N-1
//!                                      │        │             │
//!                                   DFS+poll  DFS+poll     DFS+poll
//!                                      │        │             │
//!                                      └──── announce (topic) ┘
//!                                      │        │             │
//!                                      ▼        ▼             ▼
//!                                   ┌──────── sum reduction ────────┐
//!                                   │   rank 0: coordinator/report  │
//!                                   └───────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use hashsweep::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> hashsweep::Result<()> {
//! let oracle = Algorithm::Sha1.oracle();
//! let spec = SearchSpec::new(
//!     Charset::Alpha.alphabet(),
//!     2,
//!     "c22b5f9178342609428d6f51b2c5af4c0bde6a42",
//!     oracle.as_ref(),
//! )?;
//! let group = WorkerGroup::new(GroupConfig::new().with_num_workers(4), Arc::clone(&oracle))?;
//! let report = group.run(&spec)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod broadcast;
pub mod channel;
pub mod charset;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod group;
pub mod message;
pub mod metrics;
pub mod oracle;
pub mod partition;
pub mod search;
pub mod worker;

// Re-exports
pub use broadcast::{Broadcaster, Topic, Traffic};
pub use channel::{Channel, ChannelBackend, ChannelStats, Receiver, Sender};
pub use charset::{Alphabet, Charset};
pub use config::Settings;
pub use coordinator::{AggregateReport, Coordinator};
pub use error::{Error, Result};
pub use group::{GroupConfig, WorkerGroup};
pub use message::{Announcement, Contribution, Envelope, Rank};
pub use oracle::{Algorithm, Fingerprint, HashOracle, Sha1Oracle, Sha256Oracle};
pub use partition::{Partitioner, PartitionStrategy, SpreadPartitioner, TailPartitioner, WorkerRange};
pub use search::{Candidate, CandidateBuffers, HeapBuffers, SearchContext, SearchSpec, Signal};
pub use worker::WorkerConfig;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::charset::{Alphabet, Charset};
    pub use crate::coordinator::AggregateReport;
    pub use crate::error::{Error, Result};
    pub use crate::group::{GroupConfig, WorkerGroup};
    pub use crate::oracle::{Algorithm, HashOracle};
    pub use crate::search::SearchSpec;
}
