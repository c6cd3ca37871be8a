//! Stockcast Core: next-day stock close forecasting from daily price history.
//!
//! The crate turns a ticker into a multi-day close forecast:
//! - Price history providers (Yahoo Finance, CSV, Parquet cache, synthetic)
//! - Technical indicators and the 20-column feature builder
//! - Model artifacts (LSTM and gradient-boosted trees) with their scalers
//! - One-step prediction and the recursive multi-day rollout
//! - The forecast service that validates requests and ties it all together

pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fixtures;
pub mod forecast;
pub mod indicators;
pub mod model;
pub mod predictor;
pub mod service;

pub use config::StockcastConfig;
pub use domain::{ErrorResponse, ForecastResponse, ModelChoice};
pub use error::ForecastError;
pub use service::{ForecastRequest, ForecastService};
