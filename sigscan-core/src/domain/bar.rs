//! Bar and Symbol: the fundamental market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tradable symbol: exchange code plus a human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub code: String,
    pub display_name: String,
}

impl Symbol {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
        }
    }

    /// A symbol whose display name is its code (used when name lookup fails).
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            display_name: code.clone(),
            code,
        }
    }
}

/// One trading period for one symbol: OHLCV plus turnover rate (percent of float).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub turnover_rate: f64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high bounds open/close, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Percent change of this bar's close relative to `prev_close`.
    ///
    /// Returns `None` when the reference close is not a positive number.
    pub fn pct_change_from(&self, prev_close: f64) -> Option<f64> {
        if prev_close.is_nan() || prev_close <= 0.0 || self.close.is_nan() {
            return None;
        }
        Some((self.close / prev_close - 1.0) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open: 10.0,
            high: 10.8,
            low: 9.9,
            close: 10.5,
            volume: 1_200_000,
            turnover_rate: 2.4,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 9.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn pct_change_basic() {
        let bar = sample_bar();
        let pct = bar.pct_change_from(10.0).unwrap();
        assert!((pct - 5.0).abs() < 1e-10);
    }

    #[test]
    fn pct_change_rejects_bad_reference() {
        let bar = sample_bar();
        assert!(bar.pct_change_from(0.0).is_none());
        assert!(bar.pct_change_from(f64::NAN).is_none());
    }

    #[test]
    fn symbol_from_code_uses_code_as_name() {
        let sym = Symbol::from_code("600519");
        assert_eq!(sym.display_name, "600519");
    }
}
