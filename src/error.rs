//! Error types for hashsweep

use thiserror::Error;

/// Result type alias for hashsweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while configuring or running a sweep
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Target fingerprint does not match the oracle's output format
    #[error("Hash length is NOT valid: expected {expected} hex digits, got {actual}")]
    InvalidFingerprint {
        /// Width the oracle produces
        expected: usize,
        /// Width (or offending input length) of the supplied target
        actual: usize,
    },

    /// Password length is not a positive integer
    #[error("Password must be AT LEAST one character (got {0})")]
    InvalidLength(i64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Candidate buffer could not be allocated
    #[error("Candidate allocation failed on worker {rank}: {reason}")]
    Allocation {
        /// Rank of the affected worker
        rank: usize,
        /// Allocator diagnostic
        reason: String,
    },

    /// Channel send error
    #[error("Channel send error: {0}")]
    SendError(String),

    /// Channel receive error
    #[error("Channel receive error: {0}")]
    ReceiveError(String),

    /// Workers left the group without contributing to the reduction
    #[error("Workers {missing:?} left the group without reporting")]
    WorkerLost {
        /// Ranks that never contributed
        missing: Vec<usize>,
    },

    /// Worker thread could not be started
    #[error("Failed to spawn worker {rank}: {reason}")]
    Spawn {
        /// Rank of the worker
        rank: usize,
        /// OS error
        reason: String,
    },

    /// Worker panicked
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// Configuration file could not be read or parsed
    #[error("Failed to load settings from {path}: {reason}")]
    Settings {
        /// File that was being read
        path: String,
        /// Underlying I/O or TOML error
        reason: String,
    },
}

impl Error {
    /// Whether this error was detected before any hashing took place
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidFingerprint { .. }
                | Error::InvalidLength(_)
                | Error::InvalidConfig(_)
                | Error::Settings { .. }
        )
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(err: flume::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl From<flume::RecvError> for Error {
    fn from(err: flume::RecvError) -> Self {
        Error::ReceiveError(err.to_string())
    }
}

impl<T> From<crossbeam::channel::SendError<T>> for Error {
    fn from(err: crossbeam::channel::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl From<crossbeam::channel::RecvError> for Error {
    fn from(err: crossbeam::channel::RecvError) -> Self {
        Error::ReceiveError(err.to_string())
    }
}
