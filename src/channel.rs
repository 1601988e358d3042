//! Message channels between workers
//!
//! Thin wrappers over `flume` and `crossbeam` that count traffic and expose
//! the two receive shapes the sweep needs: a blocking `recv` for the final
//! reduction and a non-blocking `poll` for termination checks.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Channel implementation backing a [`Sender`]/[`Receiver`] pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelBackend {
    /// `flume` channels
    #[default]
    Flume,

    /// `crossbeam` channels
    Crossbeam,
}

impl FromStr for ChannelBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flume" => Ok(ChannelBackend::Flume),
            "crossbeam" => Ok(ChannelBackend::Crossbeam),
            other => Err(Error::InvalidConfig(format!(
                "unknown channel backend '{other}'"
            ))),
        }
    }
}

/// Traffic counters shared by both halves of one channel
#[derive(Debug, Default)]
pub struct ChannelStats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl ChannelStats {
    /// Messages accepted by the channel
    pub fn sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Messages taken out of the channel
    pub fn received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Messages accepted but not yet taken
    pub fn pending(&self) -> u64 {
        self.sent().saturating_sub(self.received())
    }
}

/// Sender half of a channel
pub struct Sender<T> {
    inner: SenderInner<T>,
    stats: Arc<ChannelStats>,
}

enum SenderInner<T> {
    Flume(flume::Sender<T>),
    Crossbeam(crossbeam::channel::Sender<T>),
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: match &self.inner {
                SenderInner::Flume(s) => SenderInner::Flume(s.clone()),
                SenderInner::Crossbeam(s) => SenderInner::Crossbeam(s.clone()),
            },
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> Sender<T> {
    /// Send a message
    pub fn send(&self, msg: T) -> Result<()> {
        match &self.inner {
            SenderInner::Flume(s) => s.send(msg).map_err(Error::from)?,
            SenderInner::Crossbeam(s) => s.send(msg).map_err(Error::from)?,
        }
        self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send a message without blocking
    pub fn try_send(&self, msg: T) -> Result<()> {
        match &self.inner {
            SenderInner::Flume(s) => s.try_send(msg).map_err(|e| match e {
                flume::TrySendError::Full(_) => Error::SendError("Channel full".to_string()),
                flume::TrySendError::Disconnected(_) => {
                    Error::SendError("Channel disconnected".to_string())
                }
            })?,
            SenderInner::Crossbeam(s) => s.try_send(msg).map_err(|e| match e {
                crossbeam::channel::TrySendError::Full(_) => {
                    Error::SendError("Channel full".to_string())
                }
                crossbeam::channel::TrySendError::Disconnected(_) => {
                    Error::SendError("Channel disconnected".to_string())
                }
            })?,
        }
        self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Receiver half of a channel
pub struct Receiver<T> {
    inner: ReceiverInner<T>,
    stats: Arc<ChannelStats>,
}

enum ReceiverInner<T> {
    Flume(flume::Receiver<T>),
    Crossbeam(crossbeam::channel::Receiver<T>),
}

impl<T> Receiver<T> {
    /// Block until a message arrives or every sender is gone
    pub fn recv(&self) -> Result<T> {
        let msg = match &self.inner {
            ReceiverInner::Flume(r) => r.recv().map_err(Error::from)?,
            ReceiverInner::Crossbeam(r) => r.recv().map_err(Error::from)?,
        };
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        Ok(msg)
    }

    /// Take a pending message without blocking
    ///
    /// Returns `Ok(None)` when the queue is empty. Messages already queued are
    /// still delivered after every sender has been dropped; only an empty,
    /// disconnected channel is an error.
    pub fn poll(&self) -> Result<Option<T>> {
        let result = match &self.inner {
            ReceiverInner::Flume(r) => match r.try_recv() {
                Ok(msg) => Ok(Some(msg)),
                Err(flume::TryRecvError::Empty) => Ok(None),
                Err(flume::TryRecvError::Disconnected) => {
                    Err(Error::ReceiveError("Channel disconnected".to_string()))
                }
            },
            ReceiverInner::Crossbeam(r) => match r.try_recv() {
                Ok(msg) => Ok(Some(msg)),
                Err(crossbeam::channel::TryRecvError::Empty) => Ok(None),
                Err(crossbeam::channel::TryRecvError::Disconnected) => {
                    Err(Error::ReceiveError("Channel disconnected".to_string()))
                }
            },
        };

        if let Ok(Some(_)) = &result {
            self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Traffic counters of this channel
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }
}

/// Channel factory
pub struct Channel;

impl Channel {
    /// Create an unbounded channel on the given backend
    pub fn unbounded<T>(backend: ChannelBackend) -> (Sender<T>, Receiver<T>) {
        let stats = Arc::new(ChannelStats::default());

        let (tx, rx) = match backend {
            ChannelBackend::Flume => {
                let (tx, rx) = flume::unbounded();
                (SenderInner::Flume(tx), ReceiverInner::Flume(rx))
            }
            ChannelBackend::Crossbeam => {
                let (tx, rx) = crossbeam::channel::unbounded();
                (SenderInner::Crossbeam(tx), ReceiverInner::Crossbeam(rx))
            }
        };

        (
            Sender {
                inner: tx,
                stats: Arc::clone(&stats),
            },
            Receiver { inner: rx, stats },
        )
    }
}
