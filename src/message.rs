//! Message types exchanged between workers
//!
//! Workers never share memory. Everything one worker learns about another
//! arrives as one of these payloads wrapped in an [`Envelope`].

/// Rank of a worker within the group (0 is the coordinator)
pub type Rank = usize;

/// A generic envelope for typed messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T> {
    /// The actual message payload
    pub payload: T,

    /// Rank of the worker that sent the message
    pub source: Rank,
}

impl<T> Envelope<T> {
    /// Wrap a payload sent by `source`
    pub fn new(source: Rank, payload: T) -> Self {
        Self { payload, source }
    }

    /// Discard the envelope and keep the payload
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Notification that a worker recovered the password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// The recovered password
    pub password: String,
}

/// A worker's share of the final sum reduction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    /// Contributing worker
    pub rank: Rank,

    /// Leaf candidates this worker evaluated
    pub attempts: u64,

    /// Password this worker found or adopted from a peer
    pub found: Option<String>,

    /// Why this worker stopped early, if it failed
    pub failure: Option<String>,
}

impl Contribution {
    /// Contribution of a worker that ran to completion
    pub fn completed(rank: Rank, attempts: u64, found: Option<String>) -> Self {
        Self {
            rank,
            attempts,
            found,
            failure: None,
        }
    }

    /// Contribution of a worker that hit a fatal error
    pub fn failed(rank: Rank, attempts: u64, reason: impl Into<String>) -> Self {
        Self {
            rank,
            attempts,
            found: None,
            failure: Some(reason.into()),
        }
    }
}
