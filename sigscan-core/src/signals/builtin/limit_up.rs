//! Limit-up detector: the last bar closed up more than the limit threshold.
//!
//! Also reports the streak: how many consecutive bars (ending at the last one)
//! were limit-up moves.

use crate::domain::{Bar, Symbol};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct LimitUp {
    pub threshold_pct: f64,
}

impl Default for LimitUp {
    fn default() -> Self {
        Self { threshold_pct: 9.5 }
    }
}

impl LimitUp {
    pub fn new(threshold_pct: f64) -> Self {
        assert!(threshold_pct > 0.0, "threshold_pct must be > 0");
        Self { threshold_pct }
    }

    fn streak(&self, window: &[Bar]) -> usize {
        window
            .windows(2)
            .rev()
            .take_while(|pair| {
                pair[1]
                    .pct_change_from(pair[0].close)
                    .is_some_and(|pct| pct > self.threshold_pct)
            })
            .count()
    }
}

impl SignalDetector for LimitUp {
    fn id(&self) -> &str {
        "limit_up"
    }

    fn display_name(&self) -> &str {
        "Limit Up"
    }

    fn icon(&self) -> &str {
        "🚀"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let Some(gain) = super::last_change_pct(window) else {
            return Ok(SignalOutcome::quiet());
        };
        if gain <= self.threshold_pct {
            return Ok(SignalOutcome::quiet());
        }

        let streak = self.streak(window);
        Ok(SignalOutcome::hit()
            .with_metric("gain_pct", gain)
            .with_metric("streak", streak as f64)
            .with_metric("label", format!("{streak}x")))
    }
}
