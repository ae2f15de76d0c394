//! High turnover: heavy trading (turnover rate above a threshold) on an up day.

use crate::domain::{Bar, Symbol};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct HighTurnover {
    /// Minimum turnover rate in percent of float.
    pub min_turnover_pct: f64,
}

impl Default for HighTurnover {
    fn default() -> Self {
        Self {
            min_turnover_pct: 10.0,
        }
    }
}

impl SignalDetector for HighTurnover {
    fn id(&self) -> &str {
        "high_turnover"
    }

    fn display_name(&self) -> &str {
        "High Turnover"
    }

    fn icon(&self) -> &str {
        "🔄"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let Some(last) = window.last() else {
            return Err(DetectError::InsufficientBars { needed: 2, have: 0 });
        };
        if last.turnover_rate.is_nan() {
            return Err(DetectError::InvalidData("turnover rate is NaN".into()));
        }
        let gain = super::last_change_pct(window).unwrap_or(0.0);
        if last.turnover_rate < self.min_turnover_pct || gain <= 0.0 {
            return Ok(SignalOutcome::quiet());
        }
        Ok(SignalOutcome::hit()
            .with_metric("turnover_rate", last.turnover_rate)
            .with_metric("gain_pct", gain))
    }
}
