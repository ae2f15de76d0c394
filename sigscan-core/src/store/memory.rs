//! In-memory series store for tests, demos and embedding callers.
//!
//! Mutable behind a `RwLock` so a shared store can change between scans
//! (new bars, new symbols) while a `Scanner` holds an `Arc` to it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use super::{freshness_cutoff, newest_first, normalize, NameLookup, SeriesStore, StoreError, StoreMetadata};
use crate::domain::{Bar, Symbol};

#[derive(Debug, Default)]
struct Inner {
    /// Ascending, date-unique bars per code.
    series: BTreeMap<String, Vec<Bar>>,
    names: HashMap<String, String>,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    load_calls: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `(symbol, bars)` pairs in any date order.
    pub fn from_series(series: impl IntoIterator<Item = (Symbol, Vec<Bar>)>) -> Self {
        let store = Self::new();
        for (symbol, bars) in series {
            store.insert(symbol, bars);
        }
        store
    }

    /// Pins the freshness reference date instead of using the latest bar.
    pub fn with_as_of(self, as_of: NaiveDate) -> Self {
        self.write().as_of = Some(as_of);
        self
    }

    /// Replaces the whole series for a symbol.
    pub fn insert(&self, symbol: Symbol, mut bars: Vec<Bar>) {
        normalize(&mut bars);
        let mut inner = self.write();
        inner.names.insert(symbol.code.clone(), symbol.display_name);
        inner.series.insert(symbol.code, bars);
    }

    /// Appends (or overwrites) one bar for an existing or new code.
    pub fn push_bar(&self, code: &str, bar: Bar) {
        let mut inner = self.write();
        let bars = inner.series.entry(code.to_string()).or_default();
        bars.push(bar);
        normalize(bars);
    }

    pub fn remove(&self, code: &str) -> bool {
        let mut inner = self.write();
        inner.names.remove(code);
        inner.series.remove(code).is_some()
    }

    /// Simulates an unreachable backend: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `load_bars` calls served so far.
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SeriesStore for MemoryStore {
    fn list_eligible_symbols(&self, freshness_days: u32) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        let inner = self.read();
        let latest = inner
            .as_of
            .or_else(|| inner.series.values().filter_map(|b| b.last()).map(|b| b.date).max());
        let Some(latest) = latest else {
            return Ok(Vec::new());
        };
        let cutoff = freshness_cutoff(latest, freshness_days);
        Ok(inner
            .series
            .iter()
            .filter(|(_, bars)| bars.last().is_some_and(|b| b.date >= cutoff))
            .map(|(code, _)| code.clone())
            .collect())
    }

    fn latest_metadata(&self) -> Result<StoreMetadata, StoreError> {
        self.check_online()?;
        let inner = self.read();
        let mut meta = StoreMetadata::default();
        for bars in inner.series.values().filter(|b| !b.is_empty()) {
            meta.symbol_count += 1;
            meta.aggregate_volume = bars
                .iter()
                .fold(meta.aggregate_volume, |acc, b| acc.saturating_add(b.volume));
            let last = bars.last().map(|b| b.date);
            meta.max_date = meta.max_date.max(last);
        }
        Ok(meta)
    }

    fn load_bars(
        &self,
        codes: &[String],
        max_depth: usize,
    ) -> Result<HashMap<String, Vec<Bar>>, StoreError> {
        self.check_online()?;
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.read();
        Ok(codes
            .iter()
            .filter_map(|code| {
                inner
                    .series
                    .get(code)
                    .map(|bars| (code.clone(), newest_first(bars, max_depth)))
            })
            .collect())
    }
}

impl NameLookup for MemoryStore {
    fn display_names(&self, codes: &[String]) -> Result<HashMap<String, String>, StoreError> {
        self.check_online()?;
        let inner = self.read();
        Ok(codes
            .iter()
            .filter_map(|c| inner.names.get(c).map(|n| (c.clone(), n.clone())))
            .collect())
    }
}
