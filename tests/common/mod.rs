//! Shared helpers for integration tests

#![allow(dead_code)]

use hashsweep::prelude::*;
use hashsweep::{CandidateBuffers, Fingerprint, HeapBuffers, Sha1Oracle};
use parking_lot::Mutex;
use std::collections::TryReserveError;
use std::sync::Arc;

/// Build a group of `n` quiet workers hashing with `oracle`
pub fn group(n: usize, oracle: Arc<dyn HashOracle>) -> WorkerGroup {
    let config = GroupConfig::new()
        .with_num_workers(n)
        .with_progress_interval(0);
    WorkerGroup::new(config, oracle).expect("valid group")
}

/// Spec whose target is the SHA-1 of `password`
pub fn spec_for(alphabet: Alphabet, length: i64, password: &str) -> SearchSpec {
    let target = Sha1Oracle.digest(password);
    SearchSpec::new(alphabet, length, target.as_str(), &Sha1Oracle).expect("valid spec")
}

/// SHA-1 oracle that remembers every candidate together with the hashing thread
pub struct RecordingOracle {
    pub seen: Mutex<Vec<(String, String)>>,
}

impl RecordingOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Candidates hashed by each thread, in hashing order
    pub fn by_thread(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        let mut map = std::collections::BTreeMap::<String, Vec<String>>::new();
        for (thread, candidate) in self.seen.lock().iter() {
            map.entry(thread.clone()).or_default().push(candidate.clone());
        }
        map
    }
}

impl HashOracle for RecordingOracle {
    fn digest(&self, candidate: &str) -> Fingerprint {
        let thread = std::thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();
        self.seen.lock().push((thread, candidate.to_string()));
        Sha1Oracle.digest(candidate)
    }

    fn width(&self) -> usize {
        Sha1Oracle.width()
    }
}

/// SHA-1 oracle that panics when asked to hash one particular candidate
pub struct PanickingOracle {
    pub poison: &'static str,
}

impl HashOracle for PanickingOracle {
    fn digest(&self, candidate: &str) -> Fingerprint {
        if candidate == self.poison {
            panic!("oracle refused {candidate}");
        }
        Sha1Oracle.digest(candidate)
    }

    fn width(&self) -> usize {
        Sha1Oracle.width()
    }
}

/// Candidate storage that runs out on one named worker thread
pub struct StarvedThread {
    pub thread: &'static str,
}

impl CandidateBuffers for StarvedThread {
    fn buffer(&self, bytes: usize) -> std::result::Result<String, TryReserveError> {
        if std::thread::current().name() == Some(self.thread) {
            String::new().try_reserve_exact(usize::MAX)?;
        }
        HeapBuffers.buffer(bytes)
    }
}
