//! Termination broadcast
//!
//! A [`Topic`] hands every worker one [`Broadcaster`] endpoint. The worker
//! that recovers the password announces it once; every other endpoint picks
//! the announcement up with a non-blocking [`Broadcaster::poll`].
//!
//! ```text
//!            announce("hi")
//!   rank 2 ──────────────┬──────────────┬──────────────┐
//!                        ▼              ▼              ▼
//!                   rank 0 inbox   rank 1 inbox   rank 3 inbox
//! ```
//!
//! Delivery order across the group is unspecified. If two workers announce,
//! each peer keeps whichever announcement it polls last.

use crate::channel::{Channel, ChannelBackend, Receiver, Sender};
use crate::message::{Announcement, Envelope, Rank};
use tracing::{debug, warn};

/// Factory for the endpoints of one announcement topic
pub struct Topic;

impl Topic {
    /// Create one connected endpoint per rank, in rank order
    pub fn endpoints(num_workers: usize, backend: ChannelBackend) -> Vec<Broadcaster> {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..num_workers)
            .map(|_| Channel::unbounded::<Envelope<Announcement>>(backend))
            .unzip();

        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Broadcaster {
                rank,
                peers: senders
                    .iter()
                    .enumerate()
                    .filter(|(peer, _)| *peer != rank)
                    .map(|(peer, tx)| (peer, tx.clone()))
                    .collect(),
                inbox,
                announced: false,
                delivered: 0,
                unreachable: 0,
            })
            .collect()
    }
}

/// Announcement traffic seen by one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traffic {
    /// Announcements this endpoint handed to a peer inbox
    pub delivered: u64,
    /// Peers that had already left when this endpoint announced
    pub unreachable: u64,
    /// Announcements taken from this endpoint's inbox
    pub received: u64,
    /// Announcements still waiting in this endpoint's inbox
    pub unread: u64,
}

/// One worker's view of the announcement topic
pub struct Broadcaster {
    rank: Rank,
    peers: Vec<(Rank, Sender<Envelope<Announcement>>)>,
    inbox: Receiver<Envelope<Announcement>>,
    announced: bool,
    delivered: u64,
    unreachable: u64,
}

impl Broadcaster {
    /// Rank owning this endpoint
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Counters for everything this endpoint sent and received so far
    pub fn traffic(&self) -> Traffic {
        let inbox = self.inbox.stats();
        Traffic {
            delivered: self.delivered,
            unreachable: self.unreachable,
            received: inbox.received(),
            unread: inbox.pending(),
        }
    }

    /// Tell every peer the password was found, without waiting for anyone
    ///
    /// Only the first call per endpoint sends anything. Peers that already
    /// left the group are skipped.
    pub fn announce(&mut self, password: &str) {
        if self.announced {
            warn!(rank = self.rank, "duplicate announcement suppressed");
            return;
        }
        self.announced = true;

        for (peer, tx) in &self.peers {
            let envelope = Envelope::new(
                self.rank,
                Announcement {
                    password: password.to_string(),
                },
            );
            match tx.try_send(envelope) {
                Ok(()) => self.delivered += 1,
                Err(e) => {
                    self.unreachable += 1;
                    debug!(rank = self.rank, peer, error = %e, "peer unreachable for announcement");
                }
            }
        }
    }

    /// Take one pending announcement, if any
    pub fn poll(&self) -> Option<Envelope<Announcement>> {
        // A disconnected, empty inbox means every peer has left; nothing more
        // can arrive.
        self.inbox.poll().ok().flatten()
    }

    /// Drain the inbox and keep the last announcement seen
    pub fn poll_latest(&self) -> Option<Envelope<Announcement>> {
        let mut latest = None;
        while let Some(envelope) = self.poll() {
            latest = Some(envelope);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announce_reaches_every_peer_but_self() {
        let mut endpoints = Topic::endpoints(4, ChannelBackend::Flume);
        endpoints[2].announce("hi");

        for (rank, endpoint) in endpoints.iter().enumerate() {
            let got = endpoint.poll();
            if rank == 2 {
                assert!(got.is_none());
            } else {
                let envelope = got.unwrap();
                assert_eq!(envelope.source, 2);
                assert_eq!(envelope.payload.password, "hi");
            }
        }
    }

    #[test]
    fn test_announce_only_once() {
        let mut endpoints = Topic::endpoints(2, ChannelBackend::Crossbeam);
        endpoints[0].announce("first");
        endpoints[0].announce("second");
        assert_eq!(endpoints[0].traffic().delivered, 1);

        assert_eq!(endpoints[1].poll().unwrap().payload.password, "first");
        assert!(endpoints[1].poll().is_none());
    }

    #[test]
    fn test_announce_after_peer_left() {
        let mut endpoints = Topic::endpoints(3, ChannelBackend::Flume);
        let gone = endpoints.remove(1);
        drop(gone);

        endpoints[0].announce("ok");
        assert_eq!(endpoints[1].poll().unwrap().payload.password, "ok");

        let traffic = endpoints[0].traffic();
        assert_eq!(traffic.delivered, 1);
        assert_eq!(traffic.unreachable, 1);
    }

    #[test]
    fn test_traffic_counts_inbox() {
        let mut endpoints = Topic::endpoints(3, ChannelBackend::Crossbeam);
        endpoints[1].announce("one");
        endpoints[2].announce("two");
        assert_eq!(endpoints[0].traffic().unread, 2);

        endpoints[0].poll();
        assert_eq!(
            endpoints[0].traffic(),
            Traffic {
                delivered: 0,
                unreachable: 0,
                received: 1,
                unread: 1,
            }
        );
    }

    #[test]
    fn test_last_polled_wins() {
        let mut endpoints = Topic::endpoints(3, ChannelBackend::Flume);
        endpoints[1].announce("one");
        endpoints[2].announce("two");

        let latest = endpoints[0].poll_latest().unwrap();
        assert_eq!(latest.payload.password, "two");
    }

    #[test]
    fn test_single_worker_polls_nothing() {
        let endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        assert!(endpoints[0].poll().is_none());
    }
}
