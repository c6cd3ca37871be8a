//! Deterministic synthetic history for offline development and tests.
//!
//! A weekday-only random walk from 100.0, seeded by BLAKE3 of the symbol, so
//! the same symbol and range always produce the same bars. The walk is
//! generated from a fixed anchor date so that overlapping ranges agree.

use super::provider::{DataError, DataSource, FetchResult, HistoryProvider};
use crate::domain::PriceBar;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    anchor: NaiveDate,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            anchor: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Random-walk bars for `symbol` on every weekday from `start` to `end`.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut next_day = Some(start);

    while let Some(current) = next_day.filter(|d| *d <= end) {
        next_day = current.succ_opt();
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(PriceBar {
            date: current,
            open,
            high,
            low,
            close,
            adj_close: Some(close),
            volume,
        });
        price = close;
    }

    bars
}

impl HistoryProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let from = self.anchor.min(start);
        let bars = synthetic_bars(symbol, from, end)
            .into_iter()
            .filter(|b| b.date >= start)
            .collect();
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Synthetic,
        })
    }
}
