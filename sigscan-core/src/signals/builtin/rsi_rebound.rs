//! RSI oversold rebound: RSI crosses up through the oversold level on the
//! last bar.

use crate::domain::{Bar, Symbol};
use crate::indicators::{closes, rsi};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct RsiOversoldRebound {
    pub period: usize,
    pub level: f64,
}

impl Default for RsiOversoldRebound {
    fn default() -> Self {
        Self::new(14, 30.0)
    }
}

impl RsiOversoldRebound {
    pub fn new(period: usize, level: f64) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        assert!((0.0..=100.0).contains(&level), "level must be within 0..=100");
        Self { period, level }
    }
}

impl SignalDetector for RsiOversoldRebound {
    fn id(&self) -> &str {
        "rsi_oversold_rebound"
    }

    fn display_name(&self) -> &str {
        "RSI Oversold Rebound"
    }

    fn icon(&self) -> &str {
        "🔁"
    }

    // Two valid RSI values are needed, the first lands at index `period`.
    fn min_bars(&self) -> usize {
        self.period + 2
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let values = closes(window);
        let n = values.len();
        if n < self.min_bars() {
            return Err(DetectError::InsufficientBars {
                needed: self.min_bars(),
                have: n,
            });
        }

        let series = rsi(&values, self.period);
        let (prev, last) = (series[n - 2], series[n - 1]);
        if !(prev < self.level && last >= self.level) {
            return Ok(SignalOutcome::quiet());
        }

        Ok(SignalOutcome::hit()
            .with_metric("rsi", last)
            .with_metric("prev_rsi", prev))
    }
}
