//! Property-based tests for windows and indicator bounds.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use sigscan_core::indicators::{closes, rolling_max, rsi};
use sigscan_core::{Bar, SeriesWindow, SignalRegistry, Symbol};

fn bar(day_offset: i64, close: f64) -> Bar {
    Bar {
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day_offset),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1_000,
        turnover_rate: 1.0,
    }
}

fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((0i64..400, 1.0f64..500.0), 0..200)
        .prop_map(|raw| raw.into_iter().map(|(d, c)| bar(d, c)).collect())
}

proptest! {
    /// Windows are ascending, date-unique and never longer than the depth.
    #[test]
    fn window_is_ordered_and_bounded(bars in arb_bars(), depth in 1usize..120) {
        let window = SeriesWindow::new(Symbol::from_code("600000"), bars, depth);
        prop_assert!(window.len() <= depth);
        prop_assert!(window.bars().windows(2).all(|w| w[0].date < w[1].date));
    }

    /// Building from newest-first input gives the same window as from ascending.
    #[test]
    fn descending_input_matches_ascending(bars in arb_bars(), depth in 1usize..120) {
        let mut sorted = bars;
        sorted.sort_by_key(|b| b.date);
        sorted.dedup_by_key(|b| b.date);
        let mut desc = sorted.clone();
        desc.reverse();
        let sym = Symbol::from_code("000001");
        prop_assert_eq!(
            SeriesWindow::new(sym.clone(), sorted, depth),
            SeriesWindow::from_descending(sym, desc, depth)
        );
    }

    /// RSI stays inside [0, 100] wherever it is defined.
    #[test]
    fn rsi_is_bounded(values in prop::collection::vec(1.0f64..1000.0, 0..150)) {
        for v in rsi(&values, 14).into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v));
        }
    }

    /// Rolling max is never below the value at the same index.
    #[test]
    fn rolling_max_dominates(values in prop::collection::vec(-100.0f64..100.0, 1..100), period in 1usize..30) {
        let out = rolling_max(&values, period);
        for (i, m) in out.iter().enumerate().filter(|(_, m)| !m.is_nan()) {
            prop_assert!(*m >= values[i]);
        }
    }

    /// No built-in detector panics on arbitrary positive series.
    #[test]
    fn detectors_never_panic(bars in arb_bars()) {
        let window = SeriesWindow::new(Symbol::from_code("300750"), bars, 200);
        let registry = SignalRegistry::with_builtin();
        for def in registry.iter() {
            let _ = def.detect(window.bars(), &window.symbol);
        }
        prop_assert_eq!(closes(window.bars()).len(), window.len());
    }
}
