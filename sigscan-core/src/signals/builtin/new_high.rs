//! New-high breakout: the last close clears the highest close of the prior
//! `lookback` bars.

use crate::domain::{Bar, Symbol};
use crate::indicators::{closes, rolling_max};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct NewHighBreakout {
    pub lookback: usize,
}

impl Default for NewHighBreakout {
    fn default() -> Self {
        Self::new(60)
    }
}

impl NewHighBreakout {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        Self { lookback }
    }
}

impl SignalDetector for NewHighBreakout {
    fn id(&self) -> &str {
        "new_high_breakout"
    }

    fn display_name(&self) -> &str {
        "New High Breakout"
    }

    fn icon(&self) -> &str {
        "🏔"
    }

    fn min_bars(&self) -> usize {
        self.lookback + 1
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

        let prior_high = rolling_max(&values[..n - 1], self.lookback)[n - 2];
        let close = values[n - 1];
        if prior_high.is_nan() || close <= prior_high {
            return Ok(SignalOutcome::quiet());
        }

        Ok(SignalOutcome::hit()
            .with_metric("prior_high", prior_high)
            .with_metric("breakout_pct", (close / prior_high - 1.0) * 100.0))
    }
}
