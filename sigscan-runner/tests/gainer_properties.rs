//! Property tests for top-gainer aggregation.

use proptest::prelude::*;
use sigscan_runner::gainers::{GainerEntry, GainerSample, GainerTracker};

fn arb_samples() -> impl Strategy<Value = Vec<GainerSample>> {
    prop::collection::vec((0u32..500, -50.0f64..50.0, prop::bool::ANY), 0..120).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (id, gain_pct, has_limit_up))| GainerSample {
                period: 5,
                entry: GainerEntry {
                    // Index suffix keeps codes unique.
                    code: format!("{id:06}-{i}"),
                    name: String::new(),
                    gain_pct,
                    has_limit_up,
                },
            })
            .collect()
    })
}

proptest! {
    /// Merging in any batch split gives the same lists as one big merge.
    #[test]
    fn batch_split_does_not_matter(samples in arb_samples(), split in 1usize..20, top_n in 1usize..50) {
        let mut whole = GainerTracker::new(&[5], top_n);
        whole.merge(samples.clone());

        let mut batched = GainerTracker::new(&[5], top_n);
        for chunk in samples.chunks(split) {
            batched.merge(chunk.to_vec());
        }
        prop_assert_eq!(whole.finish(), batched.finish());
    }

    /// Lists are bounded, sorted descending, and the clean list has no limit-ups.
    #[test]
    fn lists_are_bounded_sorted_and_clean(samples in arb_samples(), top_n in 1usize..50) {
        let mut tracker = GainerTracker::new(&[5], top_n);
        tracker.merge(samples.clone());
        let lists = &tracker.finish()[&5];

        prop_assert!(lists.all.len() <= top_n);
        prop_assert!(lists.no_limit_up.len() <= top_n);
        prop_assert!(lists.all.windows(2).all(|w| w[0].gain_pct >= w[1].gain_pct));
        prop_assert!(lists.no_limit_up.iter().all(|e| !e.has_limit_up));

        let max = samples.iter().map(|s| s.entry.gain_pct).fold(f64::NEG_INFINITY, f64::max);
        if let Some(first) = lists.all.first() {
            prop_assert_eq!(first.gain_pct, max);
        }
    }
}
