//! Domain types for StockCast

pub mod bar;
pub mod forecast;

pub use bar::{HistoryError, PriceBar, PriceHistory};
pub use forecast::{
    ErrorResponse, Forecast, ForecastPoint, ForecastResponse, ModelChoice, PredictionPoint,
};
