//! Top-gainer aggregation, computed in the same pass as detection.
//!
//! Workers turn each window into `GainerSample`s (one per lookback period).
//! The orchestrator folds samples into a `GainerTracker`, which keeps two
//! bounded lists per period: every gainer, and gainers without a limit-up
//! bar inside the lookback.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sigscan_core::{Bar, SeriesWindow};

/// Lookback periods and the limit-up threshold, shared with the workers.
#[derive(Debug, Clone, PartialEq)]
pub struct GainerSpec {
    pub periods: Vec<usize>,
    pub limit_up_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainerSample {
    pub period: usize,
    pub entry: GainerEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainerEntry {
    pub code: String,
    pub name: String,
    pub gain_pct: f64,
    pub has_limit_up: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainerLists {
    pub all: Vec<GainerEntry>,
    pub no_limit_up: Vec<GainerEntry>,
}

/// Lists keyed by lookback period.
pub type TopGainers = BTreeMap<usize, GainerLists>;

/// Trailing gain over `period` bars and whether any single bar inside that
/// span gained more than `limit_up_pct`. Needs `period + 1` bars.
pub fn trailing_gain(bars: &[Bar], period: usize, limit_up_pct: f64) -> Option<(f64, bool)> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let span = &bars[bars.len() - period - 1..];
    let gain = span[period].pct_change_from(span[0].close)?;
    if !gain.is_finite() {
        return None;
    }
    let has_limit_up = span
        .windows(2)
        .any(|pair| pair[1].pct_change_from(pair[0].close).is_some_and(|p| p > limit_up_pct));
    Some((gain, has_limit_up))
}

impl GainerSpec {
    pub fn sample(&self, window: &SeriesWindow) -> Vec<GainerSample> {
        self.periods
            .iter()
            .filter_map(|&period| {
                let (gain_pct, has_limit_up) =
                    trailing_gain(window.bars(), period, self.limit_up_pct)?;
                Some(GainerSample {
                    period,
                    entry: GainerEntry {
                        code: window.symbol.code.clone(),
                        name: window.symbol.display_name.clone(),
                        gain_pct,
                        has_limit_up,
                    },
                })
            })
            .collect()
    }
}

/// Descending by gain, ties by code.
fn rank(a: &GainerEntry, b: &GainerEntry) -> Ordering {
    b.gain_pct
        .total_cmp(&a.gain_pct)
        .then_with(|| a.code.cmp(&b.code))
}

fn sort_and_truncate(list: &mut Vec<GainerEntry>, top_n: usize) {
    list.sort_by(rank);
    list.truncate(top_n);
}

#[derive(Debug, Clone)]
pub struct GainerTracker {
    top_n: usize,
    lists: TopGainers,
}

impl GainerTracker {
    pub fn new(periods: &[usize], top_n: usize) -> Self {
        Self {
            top_n,
            lists: periods.iter().map(|&p| (p, GainerLists::default())).collect(),
        }
    }

    /// Folds one batch of samples in and trims every list back to `top_n`.
    pub fn merge(&mut self, samples: Vec<GainerSample>) {
        for sample in samples {
            let Some(lists) = self.lists.get_mut(&sample.period) else {
                continue;
            };
            if !sample.entry.has_limit_up {
                lists.no_limit_up.push(sample.entry.clone());
            }
            lists.all.push(sample.entry);
        }
        for lists in self.lists.values_mut() {
            sort_and_truncate(&mut lists.all, self.top_n);
            sort_and_truncate(&mut lists.no_limit_up, self.top_n);
        }
    }

    pub fn finish(self) -> TopGainers {
        self.lists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use sigscan_core::Symbol;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1000,
                turnover_rate: 1.0,
            })
            .collect()
    }

    fn entry(code: &str, gain_pct: f64, has_limit_up: bool) -> GainerSample {
        GainerSample {
            period: 5,
            entry: GainerEntry {
                code: code.into(),
                name: code.into(),
                gain_pct,
                has_limit_up,
            },
        }
    }

    #[test]
    fn five_bar_gain_with_limit_up() {
        let (gain, limit) = trailing_gain(&bars(&[10.0, 10.0, 10.0, 10.0, 10.0, 11.0]), 5, 9.5).unwrap();
        assert!((gain - 10.0).abs() < 1e-9);
        assert!(limit);
    }

    #[test]
    fn limit_up_outside_lookback_is_ignored() {
        let closes = [10.0, 11.0, 11.0, 11.0, 11.0, 11.0, 11.5];
        let (_, limit) = trailing_gain(&bars(&closes), 5, 9.5).unwrap();
        assert!(!limit);
    }

    #[test]
    fn too_short_yields_nothing() {
        assert!(trailing_gain(&bars(&[10.0; 5]), 5, 9.5).is_none());
    }

    #[test]
    fn limit_up_gainer_excluded_from_clean_list() {
        let window = SeriesWindow::new(
            Symbol::from_code("600000"),
            bars(&[10.0, 10.0, 10.0, 10.0, 10.0, 11.0]),
            100,
        );
        let spec = GainerSpec {
            periods: vec![5, 10],
            limit_up_pct: 9.5,
        };
        let samples = spec.sample(&window);
        assert_eq!(samples.len(), 1);

        let mut tracker = GainerTracker::new(&[5, 10], 40);
        tracker.merge(samples);
        let top = tracker.finish();
        assert_eq!(top[&5].all.len(), 1);
        assert!(top[&5].no_limit_up.is_empty());
        assert!(top[&10].all.is_empty());
    }

    #[test]
    fn lists_sorted_truncated_and_tie_broken_by_code() {
        let mut tracker = GainerTracker::new(&[5], 3);
        tracker.merge(vec![entry("B", 5.0, false), entry("A", 5.0, false)]);
        tracker.merge(vec![entry("C", 9.0, true), entry("D", 1.0, false), entry("E", -2.0, false)]);
        let top = tracker.finish();
        let codes: Vec<&str> = top[&5].all.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "A", "B"]);
        let clean: Vec<&str> = top[&5].no_limit_up.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(clean, vec!["A", "B", "D"]);
    }
}
