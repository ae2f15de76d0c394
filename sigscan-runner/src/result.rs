//! Scan output types.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sigscan_core::Metrics;

use crate::data_cache::CacheTier;
use crate::gainers::TopGainers;
use crate::signature::ScanSignature;

/// One symbol that satisfied one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMatch {
    pub code: String,
    pub name: String,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    WholeBatch,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub universe_size: usize,
    pub symbols_evaluated: usize,
    /// Windows below the minimum evaluation length.
    pub windows_too_short: usize,
    pub batches_total: usize,
    /// Batches that timed out or failed to load.
    pub batches_skipped: usize,
    pub detector_errors: usize,
    pub strategy: ScanStrategy,
    /// Set when a whole-batch dataset came from the data cache.
    pub dataset_cache: Option<CacheTier>,
    pub elapsed_ms: u64,
}

impl ScanStats {
    pub fn new(universe_size: usize, strategy: ScanStrategy) -> Self {
        Self {
            universe_size,
            symbols_evaluated: 0,
            windows_too_short: 0,
            batches_total: 0,
            batches_skipped: 0,
            detector_errors: 0,
            strategy,
            dataset_cache: None,
            elapsed_ms: 0,
        }
    }
}

/// Output of one scan. Never mutated after it is handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub signature: ScanSignature,
    /// Every enabled signal id, mapped to its matches in universe order.
    pub signals: BTreeMap<String, Vec<SignalMatch>>,
    pub top_gainers: TopGainers,
    pub stats: ScanStats,
    pub generated_at: DateTime<Utc>,
}

impl ScanResult {
    /// A result with every requested signal mapped to an empty list.
    pub fn empty(
        signature: ScanSignature,
        signal_ids: &BTreeSet<String>,
        gainer_periods: &[usize],
        stats: ScanStats,
    ) -> Self {
        Self {
            signature,
            signals: signal_ids.iter().map(|id| (id.clone(), Vec::new())).collect(),
            top_gainers: gainer_periods.iter().map(|&p| (p, Default::default())).collect(),
            stats,
            generated_at: Utc::now(),
        }
    }

    pub fn matches(&self, signal_id: &str) -> &[SignalMatch] {
        self.signals.get(signal_id).map_or(&[], Vec::as_slice)
    }

    pub fn total_matches(&self) -> usize {
        self.signals.values().map(Vec::len).sum()
    }
}

/// Where a returned result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Computed,
    Cached,
    /// The store failed; this is the last good result.
    StaleFallback,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub result: Arc<ScanResult>,
    pub source: ResultSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigscan_core::StoreMetadata;

    #[test]
    fn empty_result_lists_every_signal() {
        let ids: BTreeSet<String> = ["limit_up", "high_turnover"].map(String::from).into();
        let sig = ScanSignature::new(&StoreMetadata::default(), 81, ids.clone());
        let result = ScanResult::empty(sig, &ids, &[5, 10], ScanStats::new(0, ScanStrategy::WholeBatch));
        assert_eq!(result.signals.len(), 2);
        assert!(result.matches("limit_up").is_empty());
        assert!(result.matches("unknown").is_empty());
        assert_eq!(result.top_gainers.len(), 2);
        assert_eq!(result.total_matches(), 0);
    }

    #[test]
    fn serializes_signal_map_as_arrays() {
        let ids: BTreeSet<String> = ["limit_up"].map(String::from).into();
        let sig = ScanSignature::new(&StoreMetadata::default(), 81, ids.clone());
        let mut result = ScanResult::empty(sig, &ids, &[], ScanStats::new(1, ScanStrategy::Streaming));
        result.signals.get_mut("limit_up").unwrap().push(SignalMatch {
            code: "600000".into(),
            name: "PF Bank".into(),
            metrics: Metrics::from([("gain_pct".to_string(), 10.0.into())]),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["signals"]["limit_up"][0]["code"], "600000");
        assert_eq!(json["signals"]["limit_up"][0]["metrics"]["gain_pct"], 10.0);
        assert_eq!(json["stats"]["strategy"], "streaming");
    }
}
