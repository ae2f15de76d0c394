//! Deterministic synthetic market data.
//!
//! Each symbol's random walk is seeded from `blake3(code)`, so the same code
//! always yields the same bars regardless of universe size or call order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::MemoryStore;
use crate::domain::{Bar, Symbol};

const MARKET_PREFIXES: [&str; 3] = ["60", "00", "30"];

/// Probability that a bar is a limit-up move.
const LIMIT_UP_CHANCE: f64 = 0.02;

fn rng_for(code: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `count` weekday bars for `code`, ascending, the last one on or before `end`.
pub fn generate_bars(code: &str, end: NaiveDate, count: usize) -> Vec<Bar> {
    let mut dates = Vec::with_capacity(count);
    let mut current = end;
    while dates.len() < count {
        if !is_weekend(current) {
            dates.push(current);
        }
        current -= Duration::days(1);
    }
    dates.reverse();

    let mut rng = rng_for(code);
    let mut price: f64 = rng.gen_range(5.0..80.0);
    let mut bars = Vec::with_capacity(count);
    for date in dates {
        let daily_return = if rng.gen_bool(LIMIT_UP_CHANCE) {
            0.10
        } else {
            rng.gen_range(-0.04..0.04)
        };
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(500_000..5_000_000u64),
            turnover_rate: rng.gen_range(0.2..15.0),
        });
        price = close;
    }
    bars
}

/// Codes cycle through the Shanghai, Shenzhen and ChiNext prefixes.
pub fn synthetic_code(index: usize) -> String {
    let prefix = MARKET_PREFIXES[index % MARKET_PREFIXES.len()];
    format!("{prefix}{:04}", index / MARKET_PREFIXES.len())
}

/// `symbols` synthetic series of `bars_per_symbol` bars each, ending at `end`.
pub fn generate_universe(
    symbols: usize,
    bars_per_symbol: usize,
    end: NaiveDate,
) -> Vec<(Symbol, Vec<Bar>)> {
    (0..symbols)
        .map(|i| {
            let code = synthetic_code(i);
            let bars = generate_bars(&code, end, bars_per_symbol);
            (Symbol::new(code.clone(), format!("Synthetic {code}")), bars)
        })
        .collect()
}

/// Convenience: a `MemoryStore` loaded with a synthetic universe.
pub fn synthetic_store(symbols: usize, bars_per_symbol: usize, end: NaiveDate) -> MemoryStore {
    MemoryStore::from_series(generate_universe(symbols, bars_per_symbol, end))
}
