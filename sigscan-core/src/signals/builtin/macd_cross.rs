//! MACD golden cross: DIF crosses above DEA on the last bar.
//!
//! DIF = EMA(fast) - EMA(slow), DEA = EMA(DIF, signal). Fires when DIF was at
//! or below DEA on the previous bar and is strictly above it now. A cross
//! below the zero line is reported through the `below_zero` metric so
//! presentation can distinguish the two flavors.

use crate::domain::{Bar, Symbol};
use crate::indicators::{closes, macd};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct MacdGoldenCross {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdGoldenCross {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

impl MacdGoldenCross {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "periods must be >= 1");
        assert!(fast < slow, "fast period must be shorter than slow period");
        Self { fast, slow, signal }
    }
}

impl SignalDetector for MacdGoldenCross {
    fn id(&self) -> &str {
        "macd_golden_cross"
    }

    fn display_name(&self) -> &str {
        "MACD Golden Cross"
    }

    fn icon(&self) -> &str {
        "✨"
    }

    fn min_bars(&self) -> usize {
        self.slow + self.signal
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let values = closes(window);
        let n = values.len();
        if n < 2 {
            return Err(DetectError::InsufficientBars { needed: 2, have: n });
        }

        let m = macd(&values, self.fast, self.slow, self.signal);
        let (dif_prev, dea_prev) = (m.dif[n - 2], m.dea[n - 2]);
        let (dif, dea) = (m.dif[n - 1], m.dea[n - 1]);
        if !(dif_prev <= dea_prev && dif > dea) {
            return Ok(SignalOutcome::quiet());
        }

        Ok(SignalOutcome::hit()
            .with_metric("dif", dif)
            .with_metric("dea", dea)
            .with_metric("hist", m.hist[n - 1])
            .with_metric("below_zero", if dif < 0.0 { 1.0 } else { 0.0 }))
    }
}
