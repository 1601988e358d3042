//! Depth-first candidate enumeration
//!
//! The search space is a tree: the root is the empty string, each level
//! appends one character, and the leaves are the strings of the target
//! length. A worker walks only the subtrees whose first character falls in
//! its [`WorkerRange`]; below the first level every node has the whole
//! alphabet as children. Siblings are visited in alphabet order, so leaves
//! come out in lexicographic order (with respect to the alphabet).
//!
//! Before expanding any node the worker polls its [`Broadcaster`]. A peer's
//! announcement unwinds the walk exactly like a local match does.

use crate::broadcast::Broadcaster;
use crate::charset::Alphabet;
use crate::error::{Error, Result};
use crate::message::Rank;
use crate::metrics::AttemptCounter;
use crate::oracle::{Fingerprint, HashOracle};
use crate::partition::WorkerRange;
use std::collections::TryReserveError;
use std::ops::Range;

/// What the search is looking for
#[derive(Debug, Clone)]
pub struct SearchSpec {
    alphabet: Alphabet,
    length: usize,
    target: Fingerprint,
}

impl SearchSpec {
    /// Validate the launch inputs
    ///
    /// The target width is checked first, then the length. Nothing is
    /// hashed unless both pass.
    pub fn new(alphabet: Alphabet, length: i64, target: &str, oracle: &dyn HashOracle) -> Result<Self> {
        let target = Fingerprint::parse(target, oracle.width())?;
        let length = match usize::try_from(length) {
            Ok(len) if len > 0 => len,
            _ => return Err(Error::InvalidLength(length)),
        };

        Ok(Self {
            alphabet,
            length,
            target,
        })
    }

    /// Candidate alphabet
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Password length (L)
    pub fn length(&self) -> usize {
        self.length
    }

    /// Digest being inverted
    pub fn target(&self) -> &Fingerprint {
        &self.target
    }

    /// Number of leaves in the full tree (A^L), saturating
    pub fn space_size(&self) -> u64 {
        let a = self.alphabet.len() as u64;
        (0..self.length).fold(1u64, |acc, _| acc.saturating_mul(a))
    }
}

/// Source of the storage behind each new [`Candidate`]
pub trait CandidateBuffers: Send + Sync {
    /// An empty string with room for exactly `bytes` bytes
    fn buffer(&self, bytes: usize) -> std::result::Result<String, TryReserveError>;
}

/// Buffers reserved from the global allocator without aborting on failure
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapBuffers;

impl CandidateBuffers for HeapBuffers {
    fn buffer(&self, bytes: usize) -> std::result::Result<String, TryReserveError> {
        let mut text = String::new();
        text.try_reserve_exact(bytes)?;
        Ok(text)
    }
}

/// A node of the search tree: an owned prefix of the password
///
/// Each candidate is built with exactly the capacity it needs and is never
/// modified afterwards.
#[derive(Debug, PartialEq, Eq)]
pub struct Candidate {
    text: String,
    chars: usize,
}

impl Candidate {
    /// The empty root
    pub fn root() -> Self {
        Self {
            text: String::new(),
            chars: 0,
        }
    }

    /// A new candidate one character longer than `self`
    pub fn extend(&self, symbol: char, rank: Rank, buffers: &dyn CandidateBuffers) -> Result<Self> {
        let mut text = buffers
            .buffer(self.text.len() + symbol.len_utf8())
            .map_err(|e| Error::Allocation {
                rank,
                reason: e.to_string(),
            })?;
        text.push_str(&self.text);
        text.push(symbol);

        Ok(Self {
            text,
            chars: self.chars + 1,
        })
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.chars
    }

    /// Whether this is the root
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// The candidate text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Take the text out of the candidate
    pub fn into_string(self) -> String {
        self.text
    }
}

/// How a subtree walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Every leaf below was evaluated without a match
    Exhausted,

    /// This worker hashed the password
    Found(String),

    /// A peer announced the password
    FoundElsewhere {
        /// Password adopted from the announcement
        password: String,
        /// Rank of the announcing peer
        source: Rank,
    },
}

impl Signal {
    /// Whether the walk should stop
    pub fn is_found(&self) -> bool {
        !matches!(self, Signal::Exhausted)
    }

    /// Recovered password, local or adopted
    pub fn password(&self) -> Option<&str> {
        match self {
            Signal::Exhausted => None,
            Signal::Found(p) | Signal::FoundElsewhere { password: p, .. } => Some(p),
        }
    }

    /// Consume the signal and keep the password
    pub fn into_password(self) -> Option<String> {
        match self {
            Signal::Exhausted => None,
            Signal::Found(p) | Signal::FoundElsewhere { password: p, .. } => Some(p),
        }
    }
}

/// Per-worker search state threaded through every recursive step
pub struct SearchContext<'a> {
    rank: Rank,
    spec: &'a SearchSpec,
    oracle: &'a dyn HashOracle,
    broadcaster: &'a mut Broadcaster,
    buffers: &'a dyn CandidateBuffers,
    counter: AttemptCounter,
}

impl<'a> SearchContext<'a> {
    /// Set up a worker's search
    pub fn new(
        spec: &'a SearchSpec,
        oracle: &'a dyn HashOracle,
        broadcaster: &'a mut Broadcaster,
        progress_interval: u64,
    ) -> Self {
        let rank = broadcaster.rank();
        Self {
            rank,
            spec,
            oracle,
            broadcaster,
            buffers: &HeapBuffers,
            counter: AttemptCounter::new(rank, progress_interval),
        }
    }

    /// Take candidate storage from `buffers` instead of the heap directly
    pub fn with_buffers(mut self, buffers: &'a dyn CandidateBuffers) -> Self {
        self.buffers = buffers;
        self
    }

    /// Walk every subtree whose first character lies in `range`
    pub fn run(&mut self, range: WorkerRange) -> Result<Signal> {
        let end = range.end.min(self.spec.alphabet.len());
        let start = range.start.min(end);
        self.expand(Candidate::root(), start..end)
    }

    /// Leaves evaluated so far
    pub fn attempts(&self) -> u64 {
        self.counter.get()
    }

    fn expand(&mut self, node: Candidate, children: Range<usize>) -> Result<Signal> {
        if let Some(signal) = self.check_peers() {
            return Ok(signal);
        }

        let spec = self.spec;
        let everything = 0..spec.alphabet.len();

        for &symbol in &spec.alphabet.symbols()[children] {
            let child = node.extend(symbol, self.rank, self.buffers)?;
            let signal = if child.len() == spec.length {
                self.evaluate(child)
            } else {
                self.expand(child, everything.clone())?
            };

            if signal.is_found() {
                return Ok(signal);
            }
        }

        Ok(Signal::Exhausted)
    }

    fn evaluate(&mut self, leaf: Candidate) -> Signal {
        let fingerprint = self.oracle.digest(leaf.as_str());
        self.counter.record(leaf.as_str(), &fingerprint);

        if fingerprint != self.spec.target {
            return Signal::Exhausted;
        }

        let password = leaf.into_string();
        tracing::info!(rank = self.rank, attempts = self.counter.get(), "password recovered");
        self.broadcaster.announce(&password);
        Signal::Found(password)
    }

    fn check_peers(&mut self) -> Option<Signal> {
        let envelope = self.broadcaster.poll()?;
        tracing::debug!(
            rank = self.rank,
            source = envelope.source,
            "peer announced password, stopping"
        );
        let source = envelope.source;
        Some(Signal::FoundElsewhere {
            password: envelope.into_payload().password,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Topic;
    use crate::channel::ChannelBackend;
    use crate::charset::Charset;
    use crate::oracle::Sha1Oracle;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every candidate it is asked to hash
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl HashOracle for Recording {
        fn digest(&self, candidate: &str) -> Fingerprint {
            self.seen.lock().push(candidate.to_string());
            Sha1Oracle.digest(candidate)
        }

        fn width(&self) -> usize {
            Sha1Oracle.width()
        }
    }

    /// Makes a peer announce once a given number of hashes has been taken
    struct AnnounceAfter {
        after: usize,
        calls: Mutex<usize>,
        peer: Mutex<Broadcaster>,
    }

    impl HashOracle for AnnounceAfter {
        fn digest(&self, candidate: &str) -> Fingerprint {
            let mut calls = self.calls.lock();
            *calls += 1;
            if *calls == self.after {
                self.peer.lock().announce("zz");
            }
            Sha1Oracle.digest(candidate)
        }

        fn width(&self) -> usize {
            40
        }
    }

    /// Refuses every buffer longer than `max_bytes`
    struct Capped {
        max_bytes: usize,
    }

    impl CandidateBuffers for Capped {
        fn buffer(&self, bytes: usize) -> std::result::Result<String, TryReserveError> {
            if bytes > self.max_bytes {
                // capacity overflow, fails without allocating
                String::new().try_reserve_exact(usize::MAX)?;
            }
            HeapBuffers.buffer(bytes)
        }
    }

    fn spec(alphabet: &str, length: i64, password: &str) -> SearchSpec {
        let target = Sha1Oracle.digest(password);
        SearchSpec::new(
            Alphabet::new(alphabet).unwrap(),
            length,
            target.as_str(),
            &Sha1Oracle,
        )
        .unwrap()
    }

    #[test]
    fn test_finds_single_char_after_two_attempts() {
        let spec = spec("abc", 1, "b");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let mut ctx = SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0);

        let signal = ctx.run(WorkerRange::new(0, 3)).unwrap();
        assert_eq!(signal, Signal::Found("b".to_string()));
        assert_eq!(ctx.attempts(), 2);
    }

    #[test]
    fn test_exhausts_full_space() {
        let spec = spec("abc", 3, "not-in-space");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let mut ctx = SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0);

        assert_eq!(ctx.run(WorkerRange::new(0, 3)).unwrap(), Signal::Exhausted);
        assert_eq!(ctx.attempts(), 27);
        assert_eq!(spec.space_size(), 27);
    }

    #[test]
    fn test_leaves_in_lexicographic_order() {
        let spec = spec("abcd", 3, "none");
        let oracle = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let mut ctx = SearchContext::new(&spec, &oracle, &mut endpoints[0], 0);
        ctx.run(WorkerRange::new(1, 3)).unwrap();

        let seen = oracle.seen.into_inner();
        assert_eq!(seen.len(), 2 * 16);
        assert_eq!(seen.first().map(String::as_str), Some("baa"));
        assert_eq!(seen.last().map(String::as_str), Some("cdd"));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.iter().all(|c| c.chars().count() == 3));
    }

    #[test]
    fn test_stops_on_pending_announcement() {
        let spec = spec("0123456789", 4, "none");
        let mut endpoints = Topic::endpoints(2, ChannelBackend::Flume);
        endpoints[1].announce("4242");

        let mut ctx = SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0);
        let signal = ctx.run(WorkerRange::new(0, 10)).unwrap();

        assert_eq!(
            signal,
            Signal::FoundElsewhere {
                password: "4242".to_string(),
                source: 1
            }
        );
        assert_eq!(ctx.attempts(), 0);
    }

    #[test]
    fn test_announcement_stops_within_one_alphabet() {
        let alphabet = Charset::Numeric.alphabet();
        let spec = SearchSpec::new(alphabet, 3, &"0".repeat(40), &Sha1Oracle).unwrap();

        for after in [1usize, 5, 10, 11, 57, 400] {
            let mut endpoints = Topic::endpoints(2, ChannelBackend::Flume);
            let peer = endpoints.pop().unwrap();
            let oracle = AnnounceAfter {
                after,
                calls: Mutex::new(0),
                peer: Mutex::new(peer),
            };

            let mut ctx = SearchContext::new(&spec, &oracle, &mut endpoints[0], 0);
            let signal = ctx.run(WorkerRange::new(0, 10)).unwrap();

            assert_eq!(signal.password(), Some("zz"));
            assert!(ctx.attempts() <= after as u64 + 10, "after {after}: {}", ctx.attempts());
        }
    }

    #[test]
    fn test_empty_range_does_nothing() {
        let spec = spec("abc", 2, "ab");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let mut ctx = SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0);

        assert_eq!(ctx.run(WorkerRange::new(3, 3)).unwrap(), Signal::Exhausted);
        assert_eq!(ctx.attempts(), 0);
    }

    #[test]
    fn test_spec_validation_order() {
        let alphabet = Charset::Alpha.alphabet();
        assert!(matches!(
            SearchSpec::new(alphabet.clone(), 0, "abc", &Sha1Oracle),
            Err(Error::InvalidFingerprint { .. })
        ));
        assert!(matches!(
            SearchSpec::new(alphabet, 0, &"a".repeat(40), &Sha1Oracle),
            Err(Error::InvalidLength(0))
        ));
    }

    #[test]
    fn test_candidate_extend_is_exact() {
        let root = Candidate::root();
        let a = root.extend('a', 0, &HeapBuffers).unwrap();
        let ab = a.extend('b', 0, &HeapBuffers).unwrap();

        assert!(root.is_empty());
        assert_eq!(a.as_str(), "a");
        assert_eq!(ab.as_str(), "ab");
        assert_eq!(ab.len(), 2);
        assert_eq!(ab.into_string().capacity(), 2);
    }

    #[test]
    fn test_shared_oracle_is_usable() {
        let oracle: Arc<dyn HashOracle> = Arc::new(Sha1Oracle);
        let spec = spec("ab", 2, "ba");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let mut ctx = SearchContext::new(&spec, oracle.as_ref(), &mut endpoints[0], 1);

        assert_eq!(ctx.run(WorkerRange::new(0, 2)).unwrap().password(), Some("ba"));
        assert_eq!(ctx.attempts(), 3);
    }

    #[test]
    fn test_allocation_failure_keeps_count() {
        let spec = spec("abc", 3, "none");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let buffers = Capped { max_bytes: 2 };
        let mut ctx =
            SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0).with_buffers(&buffers);

        let err = ctx.run(WorkerRange::new(0, 3)).unwrap_err();
        assert!(matches!(err, Error::Allocation { rank: 0, .. }));
        assert_eq!(ctx.attempts(), 0);
    }

    #[test]
    fn test_capped_buffers_allow_short_candidates() {
        let spec = spec("ab", 2, "none");
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let buffers = Capped { max_bytes: 2 };
        let mut ctx =
            SearchContext::new(&spec, &Sha1Oracle, &mut endpoints[0], 0).with_buffers(&buffers);

        assert_eq!(ctx.run(WorkerRange::new(0, 2)).unwrap(), Signal::Exhausted);
        assert_eq!(ctx.attempts(), 4);
    }
}
