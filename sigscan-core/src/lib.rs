//! SigScan Core: domain types, indicator math, signal detectors and series stores.
//!
//! This crate contains everything a scan needs that is not orchestration:
//! - Domain types (symbols, bars, series windows, datasets)
//! - Indicator helpers over close/volume series (trailing mean, EMA, MACD, RSI, rolling max)
//! - The `SignalDetector` trait, the signal registry and the built-in catalog
//! - The `SeriesStore` / `NameLookup` boundary plus in-memory, CSV and synthetic stores

pub mod domain;
pub mod indicators;
pub mod signals;
pub mod store;

pub use domain::{Bar, Dataset, SeriesWindow, Symbol};
pub use signals::{
    DetectError, MetricValue, Metrics, RegistryError, SignalDefinition, SignalDetector,
    SignalOutcome, SignalRegistry,
};
pub use store::{CsvDirStore, MemoryStore, NameLookup, SeriesStore, StoreError, StoreMetadata};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses into the worker pool is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<SeriesWindow>();
        require_sync::<SeriesWindow>();
        require_send::<Dataset>();
        require_sync::<Dataset>();
        require_send::<SignalDefinition>();
        require_sync::<SignalDefinition>();
        require_send::<SignalRegistry>();
        require_sync::<SignalRegistry>();
        require_send::<SignalOutcome>();
        require_sync::<SignalOutcome>();
        require_send::<store::MemoryStore>();
        require_sync::<store::MemoryStore>();
        require_send::<store::CsvDirStore>();
        require_sync::<store::CsvDirStore>();
    }

    /// Architecture contract: detectors see only the window and the symbol.
    ///
    /// `detect()` takes `&[Bar]` and `&Symbol`; there is no way to reach the
    /// store, the caches or other symbols from inside a detector.
    #[test]
    fn detector_trait_sees_only_window_and_symbol() {
        fn _check_trait_object_builds(
            det: &dyn SignalDetector,
            bars: &[Bar],
            symbol: &Symbol,
        ) -> Result<SignalOutcome, DetectError> {
            det.detect(bars, symbol)
        }
    }
}
