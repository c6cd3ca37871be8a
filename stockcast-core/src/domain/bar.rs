//! PriceBar, the daily market data unit, and the validated history built from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar for a single symbol.
///
/// `adj_close` is optional because not every source reports it; consumers read
/// it through [`PriceBar::adjusted_close`], which falls back to the raw close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
    pub volume: u64,
}

impl PriceBar {
    /// Adjusted close, or the raw close when the source did not provide one.
    pub fn adjusted_close(&self) -> f64 {
        self.adj_close.unwrap_or(self.close)
    }

    /// Returns true if any OHLC field is NaN or infinite (void bar).
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.adj_close.map_or(true, f64::is_finite))
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Why a bar sequence could not become a [`PriceHistory`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("price history for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("dates not strictly increasing at index {index}: {previous} followed by {current}")]
    NotStrictlyIncreasing {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Ordered, non-empty bar sequence for one symbol with strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, HistoryError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(HistoryError::Empty { symbol });
        }
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(HistoryError::NotStrictlyIncreasing {
                    index: index + 1,
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar. Never fails: a history always holds at least one bar.
    pub fn last(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last().date
    }
}
