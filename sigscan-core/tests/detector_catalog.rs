//! Built-in catalog over synthetic data: every detector runs cleanly on every
//! window that satisfies its minimum, and the registry wiring holds together.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sigscan_core::store::synthetic::generate_universe;
use sigscan_core::{SeriesWindow, SignalRegistry};

fn end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

#[test]
fn every_detector_succeeds_on_long_enough_windows() {
    let registry = SignalRegistry::with_builtin();
    let defs = registry.enabled(None);
    let depth = SignalRegistry::required_depth(&defs);

    for (symbol, bars) in generate_universe(30, depth, end()) {
        let window = SeriesWindow::new(symbol.clone(), bars, depth);
        for def in &defs {
            assert!(def.accepts_len(window.len()));
            let out = def.detect(window.bars(), &symbol);
            assert!(out.is_ok(), "{} failed on {}: {:?}", def.id(), symbol.code, out);
        }
    }
}

#[test]
fn synthetic_universe_triggers_something() {
    // Fixed seeds; with 200 walks the last bar is a limit-up or heavy-turnover
    // up day for dozens of symbols.
    let registry = SignalRegistry::with_builtin();
    let defs = registry.enabled(None);
    let hits: usize = generate_universe(200, 120, end())
        .into_iter()
        .map(|(symbol, bars)| {
            defs.iter()
                .filter(|d| d.detect(&bars, &symbol).is_ok_and(|o| o.triggered))
                .count()
        })
        .sum();
    assert!(hits > 0);
}

#[test]
fn required_depth_is_longest_minimum_plus_margin() {
    let registry = SignalRegistry::with_builtin();
    let defs = registry.enabled(None);
    let longest = defs.iter().map(|d| d.min_bars()).max().unwrap();
    assert_eq!(longest, 61);
    assert_eq!(SignalRegistry::required_depth(&defs), longest + 20);
    assert_eq!(SignalRegistry::required_depth(&[]), 150);
}

#[test]
fn filtered_subset_ignores_unknown_ids() {
    let registry = SignalRegistry::with_builtin();
    let filter: BTreeSet<String> = ["limit_up", "no_such_signal"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let defs = registry.enabled(Some(&filter));
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].id(), "limit_up");
}
