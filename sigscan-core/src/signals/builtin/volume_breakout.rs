//! Volume breakout: volume at least `ratio` times the mean of the prior
//! `lookback` bars on a strong up day.

use crate::domain::{Bar, Symbol};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct VolumeBreakout {
    pub lookback: usize,
    pub ratio: f64,
    pub min_gain_pct: f64,
}

impl Default for VolumeBreakout {
    fn default() -> Self {
        Self {
            lookback: 20,
            ratio: 2.0,
            min_gain_pct: 3.0,
        }
    }
}

impl SignalDetector for VolumeBreakout {
    fn id(&self) -> &str {
        "volume_breakout"
    }

    fn display_name(&self) -> &str {
        "Volume Breakout"
    }

    fn icon(&self) -> &str {
        "📊"
    }

    fn min_bars(&self) -> usize {
        self.lookback + 1
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let n = window.len();
        if n < self.min_bars() {
            return Err(DetectError::InsufficientBars {
                needed: self.min_bars(),
                have: n,
            });
        }

        let prior = &window[n - 1 - self.lookback..n - 1];
        let mean = prior.iter().map(|b| b.volume as f64).sum::<f64>() / self.lookback as f64;
        if mean <= 0.0 {
            return Ok(SignalOutcome::quiet());
        }

        let ratio = window[n - 1].volume as f64 / mean;
        let gain = super::last_change_pct(window).unwrap_or(0.0);
        if ratio < self.ratio || gain < self.min_gain_pct {
            return Ok(SignalOutcome::quiet());
        }

        Ok(SignalOutcome::hit()
            .with_metric("volume_ratio", ratio)
            .with_metric("gain_pct", gain))
    }
}
