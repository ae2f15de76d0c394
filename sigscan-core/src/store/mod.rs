//! Series store boundary and local implementations.
//!
//! The `SeriesStore` trait abstracts over where bars come from (an ingestion
//! database, a CSV directory, an in-memory fixture) so the scanner can be
//! driven and mocked without knowing the source. Caching sits above this
//! trait; stores know nothing about signatures or snapshots.

pub mod csv_dir;
pub mod memory;
pub mod synthetic;

pub use csv_dir::CsvDirStore;
pub use memory::MemoryStore;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Dataset-level summary used to build the scan signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Most recent bar date across all symbols, `None` for an empty store.
    pub max_date: Option<NaiveDate>,
    /// Number of symbols with at least one bar.
    pub symbol_count: usize,
    /// Sum of volume over every stored bar.
    pub aggregate_volume: u64,
}

/// Structured store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("store error: {0}")]
    Other(String),
}

/// Source of per-symbol daily bars.
pub trait SeriesStore: Send + Sync {
    /// Codes with at least one bar inside the freshness window, measured back
    /// from the store's latest bar date.
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError>;

    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError>;

    /// Up to `max_depth` most recent bars per requested code, newest first,
    /// one bar per date. Unknown codes are absent from the map.
    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError>;
}

/// Resolves display names for codes. Missing entries fall back to the code.
pub trait NameLookup: Send + Sync {
    fn display_names(&self, codes: &[String]) -> Result<HashMap<String, String>, StoreError>;
}

/// Earliest date still inside a freshness window ending at `latest`.
pub fn freshness_cutoff(latest: NaiveDate, freshness_days: u32) -> NaiveDate {
    latest - Duration::days(i64::from(freshness_days))
}

/// Newest `max_depth` bars of an ascending, date-unique series, newest first.
pub(crate) fn newest_first(bars: &[Bar], max_depth: usize) -> Vec<Bar> {
    bars.iter().rev().take(max_depth).cloned().collect()
}

/// Sorts ascending and keeps the last bar seen for each date.
pub(crate) fn normalize(bars: &mut Vec<Bar>) {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars.drain(..) {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    *bars = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_counts_calendar_days() {
        let latest = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(
            freshness_cutoff(latest, 7),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
        );
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let mut bars = crate::indicators::make_bars(&[1.0, 2.0, 3.0]);
        let mut dup = bars[1].clone();
        dup.close = 9.0;
        bars.push(dup);
        bars.reverse();
        normalize(&mut bars);
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn newest_first_truncates() {
        let bars = crate::indicators::make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let out = newest_first(&bars, 2);
        assert_eq!(out.iter().map(|b| b.close).collect::<Vec<_>>(), vec![4.0, 3.0]);
    }
}
