//! Forecast domain types and the JSON shapes handed to callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which persisted model family to forecast with.
///
/// Each choice selects a distinct artifact set in the model store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    /// Recurrent network over the full feature window.
    #[default]
    Lstm,
    /// Gradient-boosted regression trees over the flattened window.
    Xgb,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 2] = [ModelChoice::Lstm, ModelChoice::Xgb];

    /// Artifact-set identifier; also the file-name prefix in the model store.
    pub fn id(self) -> &'static str {
        match self {
            ModelChoice::Lstm => "lstm",
            ModelChoice::Xgb => "xgb",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lstm" | "recurrent" => Ok(ModelChoice::Lstm),
            "xgb" | "xgboost" | "gbm" | "trees" => Ok(ModelChoice::Xgb),
            other => Err(format!("unknown model '{other}' (expected 'lstm' or 'xgb')")),
        }
    }
}

/// One predicted close for one future calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_close: f64,
}

/// Output of the recursive forecaster: points in ascending date order plus the
/// last real bar they were projected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub last_date: NaiveDate,
    pub last_close: f64,
}

/// Chart-ready prediction point: `x` is the date, `y` the price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub x: NaiveDate,
    pub y: f64,
}

/// JSON body returned for a successful forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub symbol: String,
    /// Regressor artifact the forecast came from, e.g. `lstm_model.json`.
    pub model: String,
    pub predictions: Vec<PredictionPoint>,
    pub last_date: NaiveDate,
    pub last_close: f64,
}

impl ForecastResponse {
    /// Render a forecast. Predicted prices are rounded to 4 decimals; the
    /// reference close is passed through untouched.
    pub fn new(symbol: impl Into<String>, model: impl Into<String>, forecast: &Forecast) -> Self {
        Self {
            symbol: symbol.into(),
            model: model.into(),
            predictions: forecast
                .points
                .iter()
                .map(|p| PredictionPoint {
                    x: p.date,
                    y: round4(p.predicted_close),
                })
                .collect(),
            last_date: forecast.last_date,
            last_close: forecast.last_close,
        }
    }
}

/// JSON body returned when a forecast fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
