//! Moving-average bull alignment: close > MA5 > MA10 > MA20 > MA60.

use crate::domain::{Bar, Symbol};
use crate::indicators::{closes, trailing_mean};
use crate::signals::{DetectError, SignalDetector, SignalOutcome};

#[derive(Debug, Clone)]
pub struct MaBullAlignment {
    /// Strictly increasing MA periods, shortest first.
    pub periods: Vec<usize>,
}

impl Default for MaBullAlignment {
    fn default() -> Self {
        Self::new(vec![5, 10, 20, 60])
    }
}

impl MaBullAlignment {
    pub fn new(periods: Vec<usize>) -> Self {
        assert!(!periods.is_empty(), "need at least one MA period");
        assert!(
            periods.windows(2).all(|p| p[0] < p[1]),
            "MA periods must be strictly increasing"
        );
        Self { periods }
    }

    fn longest(&self) -> usize {
        self.periods.last().copied().unwrap_or(1)
    }
}

impl SignalDetector for MaBullAlignment {
    fn id(&self) -> &str {
        "ma_bull_alignment"
    }

    fn display_name(&self) -> &str {
        "MA Bull Alignment"
    }

    fn icon(&self) -> &str {
        "📈"
    }

    fn min_bars(&self) -> usize {
        self.longest()
    }

    fn detect(&self, window: &[Bar], _symbol: &Symbol) -> Result<SignalOutcome, DetectError> {
        let values = closes(window);
        let mut mas = Vec::with_capacity(self.periods.len());
        for &p in &self.periods {
            let ma = trailing_mean(&values, p).ok_or(DetectError::InsufficientBars {
                needed: p,
                have: values.len(),
            })?;
            mas.push(ma);
        }

        let close = values[values.len() - 1];
        let aligned = close > mas[0] && mas.windows(2).all(|pair| pair[0] > pair[1]);
        if !aligned {
            return Ok(SignalOutcome::quiet());
        }

        let short = mas[0];
        let long = mas[mas.len() - 1];
        Ok(SignalOutcome::hit()
            .with_metric("ma_short", short)
            .with_metric("ma_long", long)
            .with_metric("spread_pct", (short / long - 1.0) * 100.0))
    }
}
