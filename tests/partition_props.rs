//! Property tests for alphabet partitioning and enumeration order

use hashsweep::broadcast::Topic;
use hashsweep::partition::assign;
use hashsweep::{
    Alphabet, ChannelBackend, Fingerprint, HashOracle, Partitioner, SearchContext, SearchSpec,
    Sha1Oracle, SpreadPartitioner, TailPartitioner, WorkerRange,
};
use parking_lot::Mutex;
use proptest::prelude::*;

fn check_cover(p: &dyn Partitioner, a: usize, n: usize) -> Vec<WorkerRange> {
    let ranges: Vec<WorkerRange> = (0..n).map(|r| assign(p, a, n, r).unwrap()).collect();

    let mut owner = vec![None; a];
    for (rank, range) in ranges.iter().enumerate() {
        assert!(range.end <= a);
        for i in range.indices() {
            assert!(owner[i].is_none(), "index {i} assigned twice");
            owner[i] = Some(rank);
        }
    }
    assert!(owner.iter().all(Option::is_some), "gap in partition of {a} over {n}");
    ranges
}

proptest! {
    #[test]
    fn tail_partition_is_exact(a in 1usize..200, n in 1usize..64) {
        let ranges = check_cover(&TailPartitioner, a, n);
        let base = a / n;
        for range in &ranges[..n - 1] {
            prop_assert!(range.len() == base || range.is_empty());
        }
        prop_assert_eq!(ranges[n - 1].end, a);
    }

    #[test]
    fn spread_partition_is_exact_and_balanced(a in 1usize..200, n in 1usize..64) {
        let ranges = check_cover(&SpreadPartitioner, a, n);
        let min = ranges.iter().map(WorkerRange::len).min().unwrap();
        let max = ranges.iter().map(WorkerRange::len).max().unwrap();
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn leaves_are_strictly_increasing(start in 0usize..5, span in 0usize..5, length in 1i64..4) {
        struct Recording(Mutex<Vec<String>>);

        impl HashOracle for Recording {
            fn digest(&self, candidate: &str) -> Fingerprint {
                self.0.lock().push(candidate.to_string());
                Sha1Oracle.digest(candidate)
            }
            fn width(&self) -> usize {
                40
            }
        }

        let alphabet = Alphabet::new("01234").unwrap();
        let spec = SearchSpec::new(alphabet, length, &"e".repeat(40), &Sha1Oracle).unwrap();
        let oracle = Recording(Mutex::new(Vec::new()));
        let mut endpoints = Topic::endpoints(1, ChannelBackend::Flume);
        let range = WorkerRange::new(start, (start + span).min(5));

        let mut ctx = SearchContext::new(&spec, &oracle, &mut endpoints[0], 0);
        ctx.run(range).unwrap();
        let attempts = ctx.attempts();

        let seen = oracle.0.into_inner();
        prop_assert_eq!(seen.len() as u64, attempts);
        prop_assert_eq!(attempts, range.len() as u64 * 5u64.pow(length as u32 - 1));
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}
