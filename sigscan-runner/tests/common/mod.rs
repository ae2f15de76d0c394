//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use chrono::NaiveDate;
use sigscan_core::store::synthetic::synthetic_store;
use sigscan_core::{
    Bar, DetectError, MemoryStore, SeriesStore, SignalDetector, SignalOutcome, StoreError,
    StoreMetadata, Symbol,
};
use sigscan_runner::ScanConfig;

pub fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

/// Consecutive daily bars ending at `end_date()`.
pub fn series(closes: &[f64]) -> Vec<Bar> {
    let n = closes.len() as i64;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: end_date() - chrono::Duration::days(n - 1 - i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000_000,
                turnover_rate: 1.0,
            }
        })
        .collect()
}

pub fn uptrend(len: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..len).map(|i| 10.0 + i as f64 * 0.1).collect();
    series(&closes)
}

pub fn synthetic(symbols: usize) -> Arc<MemoryStore> {
    Arc::new(synthetic_store(symbols, 120, end_date()))
}

/// Small batches, no progress throttling.
pub fn test_config() -> ScanConfig {
    ScanConfig {
        batch_size: 25,
        progress_interval_ms: 0,
        batch_timeout_ms: 30_000,
        ..ScanConfig::default()
    }
}

/// Fires on every symbol; sleeps first.
pub struct Slow(pub Duration);

impl SignalDetector for Slow {
    fn id(&self) -> &str {
        "slow"
    }
    fn display_name(&self) -> &str {
        "Slow"
    }
    fn min_bars(&self) -> usize {
        1
    }
    fn detect(&self, _window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        std::thread::sleep(self.0);
        Ok(SignalOutcome::hit())
    }
}

/// Fires on every symbol except `poison`, where it panics.
pub struct Panicky {
    pub poison: String,
}

impl SignalDetector for Panicky {
    fn id(&self) -> &str {
        "panicky"
    }
    fn display_name(&self) -> &str {
        "Panicky"
    }
    fn min_bars(&self) -> usize {
        1
    }
    fn detect(&self, _window: &[Bar], symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        if symbol.code == self.poison {
            panic!("poisoned symbol {}", symbol.code);
        }
        Ok(SignalOutcome::hit())
    }
}

/// Delegates to a `MemoryStore`; `load_bars` fails for any batch that
/// contains one of the `failing` codes.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    pub failing: Vec<String>,
}

impl SeriesStore for FlakyStore {
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError> {
        self.inner.list_eligible_symbols(freshness_days)
    }
    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError> {
        self.inner.latest_metadata()
    }
    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError> {
        if codes.iter().any(|c| self.failing.contains(c)) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.load_bars(codes, max_depth)
    }
}

/// Blocks the first `latest_metadata` call between two barrier waits, so a
/// test can observe a scan that is in flight.
pub struct BlockingStore {
    pub inner: Arc<MemoryStore>,
    pub barrier: Arc<Barrier>,
    pub armed: AtomicBool,
}

impl BlockingStore {
    pub fn new(inner: Arc<MemoryStore>, barrier: Arc<Barrier>) -> Self {
        Self {
            inner,
            barrier,
            armed: AtomicBool::new(true),
        }
    }
}

impl SeriesStore for BlockingStore {
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError> {
        self.inner.list_eligible_symbols(freshness_days)
    }
    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.barrier.wait();
            self.barrier.wait();
        }
        self.inner.latest_metadata()
    }
    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError> {
        self.inner.load_bars(codes, max_depth)
    }
}

/// Delegates to a `MemoryStore` but leaves `code` out of `load_bars` results
/// while `active` is set, as a store with a lagging replica would.
pub struct ForgetfulStore {
    pub inner: Arc<MemoryStore>,
    pub code: String,
    pub active: AtomicBool,
}

impl SeriesStore for ForgetfulStore {
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError> {
        self.inner.list_eligible_symbols(freshness_days)
    }
    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError> {
        self.inner.latest_metadata()
    }
    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError> {
        let mut loaded = self.inner.load_bars(codes, max_depth)?;
        if self.active.load(Ordering::SeqCst) {
            loaded.remove(&self.code);
        }
        Ok(loaded)
    }
}

/// A `FileBlobCache` whose first `get` parks between two barrier waits, so a
/// test can act while a scan is inside tier-2 I/O.
pub struct GatedBlob {
    pub inner: sigscan_runner::FileBlobCache,
    pub barrier: Arc<Barrier>,
    pub armed: AtomicBool,
}

impl sigscan_runner::BlobCache for GatedBlob {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, sigscan_runner::CacheError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.barrier.wait();
            self.barrier.wait();
        }
        self.inner.get(key)
    }
    fn put(
        &self,
        key: &str,
        payload: &[u8],
        ttl: Duration,
    ) -> Result<(), sigscan_runner::CacheError> {
        self.inner.put(key, payload, ttl)
    }
    fn remove(&self, key: &str) -> Result<(), sigscan_runner::CacheError> {
        self.inner.remove(key)
    }
    fn clear(&self) -> Result<usize, sigscan_runner::CacheError> {
        self.inner.clear()
    }
}

/// Fires on every window it is given.
pub struct Always {
    pub id: &'static str,
    pub min_bars: usize,
}

impl SignalDetector for Always {
    fn id(&self) -> &str {
        self.id
    }
    fn display_name(&self) -> &str {
        self.id
    }
    fn min_bars(&self) -> usize {
        self.min_bars
    }
    fn detect(&self, _window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        Ok(SignalOutcome::hit())
    }
}
