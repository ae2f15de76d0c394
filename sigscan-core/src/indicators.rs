//! Indicator math over plain value series.
//!
//! Every function returns a vector the same length as its input, with `NaN`
//! in positions that do not have enough history yet. Detectors usually only
//! read the last one or two values.

use crate::domain::Bar;

/// Close prices of a bar slice.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Mean of the last `period` values, or `None` if there are fewer values.
pub fn trailing_mean(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average with `alpha = 2 / (period + 1)`.
///
/// Seeded with the first value, the convention used by most A-share charting
/// packages for MACD, so every position is defined.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "EMA period must be >= 1");
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// MACD lines: DIF = EMA(fast) - EMA(slow), DEA = EMA(DIF, signal), HIST = 2 * (DIF - DEA).
#[derive(Debug, Clone)]
pub struct Macd {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub hist: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    assert!(fast < slow, "MACD fast period must be shorter than slow period");
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let dif: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let dea = ema(&dif, signal);
    let hist = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();
    Macd { dif, dea, hist }
}

/// Relative Strength Index with Wilder smoothing.
///
/// First valid value at index `period`. avg_loss == 0 gives 100, avg_gain == 0 gives 0.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_from(avg_gain, avg_loss);

    let p = period as f64;
    for i in (period + 1)..n {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = rsi_from(avg_gain, avg_loss);
    }
    out
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Rolling maximum over `period` values. First valid value at index `period - 1`.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "rolling_max period must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in (period.saturating_sub(1))..n {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }
    out
}

/// Create bars from close prices for testing.
///
/// open = previous close (or close for the first bar), high/low = ±1% around
/// the body, volume 1_000_000, turnover 1.0, consecutive calendar days.
#[cfg(test)]
pub(crate) fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000_000,
                turnover_rate: 1.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}
