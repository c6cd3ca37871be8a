//! History provider trait and structured data errors.
//!
//! The `HistoryProvider` trait abstracts over where daily bars come from
//! (Yahoo Finance, CSV files, the Parquet cache, a synthetic walk) so the
//! forecast service can swap sources and tests can inject fixed data.

use super::canonicalize::{canonicalize, CanonicalReport};
use crate::domain::{HistoryError, PriceBar, PriceHistory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("CSV import error: {0}")]
    Csv(String),

    #[error("no cached data for symbol '{symbol}', run `stockcast download {symbol}` first")]
    NoCachedData { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

impl From<HistoryError> for DataError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Empty { symbol } => DataError::SymbolNotFound { symbol },
            other => DataError::ValidationError(other.to_string()),
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Cache,
    Synthetic,
}

/// Bars returned by one provider call, as delivered: possibly unsorted,
/// duplicated or containing void rows.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
}

impl FetchResult {
    /// Canonicalize the raw bars into a validated history.
    pub fn into_history(self) -> Result<(PriceHistory, CanonicalReport), DataError> {
        let (bars, report) = canonicalize(self.bars);
        let history = PriceHistory::new(self.symbol, bars)?;
        Ok((history, report))
    }
}

/// A source of daily bars.
///
/// Providers only fetch; caching sits above this trait.
pub trait HistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Daily bars for `symbol` between `start` and `end` inclusive.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// False while the provider is refusing requests (circuit breaker open).
    fn is_available(&self) -> bool {
        true
    }
}
