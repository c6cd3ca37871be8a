//! Forecast error taxonomy.
//!
//! Every failure of a forecast call surfaces as one `ForecastError`. Callers map
//! variants to their own responses; nothing in the core retries.

use crate::data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// Empty symbol, negative or oversized horizon, unparsable period token.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The history provider had nothing at all for this identifier.
    #[error("no price history found for symbol '{symbol}'")]
    InvalidSymbol { symbol: String },

    #[error("not enough history: {available} feature rows available, model lookback needs {required}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("missing model artifact(s) for '{model}': {}", .missing.join(", "))]
    MissingArtifact { model: String, missing: Vec<String> },

    #[error("incompatible model '{model}': {reason}")]
    IncompatibleModel { model: String, reason: String },

    /// Provider unreachable, or it returned empty/malformed data.
    #[error("history fetch failed: {0}")]
    UpstreamFetchFailure(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ForecastError {
    /// True for failures caused by the request itself rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InvalidInput(_) | ForecastError::InvalidSymbol { .. }
        )
    }

    pub(crate) fn incompatible(model: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::IncompatibleModel {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl From<DataError> for ForecastError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::SymbolNotFound { symbol } | DataError::NoCachedData { symbol } => {
                ForecastError::InvalidSymbol { symbol }
            }
            other => ForecastError::UpstreamFetchFailure(other.to_string()),
        }
    }
}
