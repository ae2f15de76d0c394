//! Series windows and datasets.
//!
//! A `SeriesWindow` is the most recent N bars of one symbol in ascending date
//! order. A `Dataset` is an ordered collection of windows keyed by code; it is
//! the unit the data cache stores and the unit a streaming batch loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bar::{Bar, Symbol};

/// Ordered bars for one symbol, ascending by date, at most `depth` long.
///
/// Immutable once built: there is no way to push or edit bars afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesWindow {
    pub symbol: Symbol,
    bars: Vec<Bar>,
}

impl SeriesWindow {
    /// Build a window from bars in any order.
    ///
    /// Sorts ascending by date, drops repeated dates (first occurrence wins)
    /// and keeps only the most recent `depth` bars.
    pub fn new(symbol: Symbol, mut bars: Vec<Bar>, depth: usize) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        if bars.len() > depth {
            bars.drain(..bars.len() - depth);
        }
        Self { symbol, bars }
    }

    /// Build a window from store output, which arrives newest-first.
    pub fn from_descending(symbol: Symbol, mut bars: Vec<Bar>, depth: usize) -> Self {
        bars.reverse();
        Self::new(symbol, bars, depth)
    }

    pub fn code(&self) -> &str {
        &self.symbol.code
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The trailing `n` bars (or all of them if the window is shorter).
    pub fn recent(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

/// Windows for many symbols, ordered by code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    windows: BTreeMap<String, SeriesWindow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window, replacing any previous window for the same code.
    pub fn insert(&mut self, window: SeriesWindow) {
        self.windows.insert(window.code().to_string(), window);
    }

    pub fn get(&self, code: &str) -> Option<&SeriesWindow> {
        self.windows.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.windows.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(|k| k.as_str())
    }

    pub fn windows(&self) -> impl Iterator<Item = &SeriesWindow> {
        self.windows.values()
    }

    /// Move every window of `other` into this dataset.
    pub fn absorb(&mut self, other: Dataset) {
        self.windows.extend(other.windows);
    }

    /// Total number of bars held across all windows.
    pub fn bar_count(&self) -> usize {
        self.windows.values().map(|w| w.len()).sum()
    }
}

impl FromIterator<SeriesWindow> for Dataset {
    fn from_iter<I: IntoIterator<Item = SeriesWindow>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for window in iter {
            dataset.insert(window);
        }
        dataset
    }
}
