//! `stockcast.toml` configuration.
//!
//! Every section and field is optional; a missing file means all defaults.
//!
//! ```toml
//! [forecast]
//! default_days = 7
//! default_period = "1y"
//! max_days = 365
//!
//! [models]
//! dir = "model"
//! cache_capacity = 4
//! cache_ttl_secs = 3600
//!
//! [history]
//! provider = { type = "CSV", dir = "data/csv" }
//! cache_capacity = 64
//! cache_ttl_secs = 300
//! ```

use crate::data::HistoryPeriod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockcastConfig {
    pub forecast: ForecastSettings,
    pub models: ModelSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub default_days: u32,
    pub default_period: HistoryPeriod,
    pub max_days: u32,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            default_days: 7,
            default_period: HistoryPeriod::ONE_YEAR,
            max_days: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("model"),
            cache_capacity: 4,
            cache_ttl_secs: 3600,
        }
    }
}

impl ModelSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Which history provider backs the forecast service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderConfig {
    #[default]
    Yahoo,
    Csv {
        dir: PathBuf,
    },
    Synthetic,
    Parquet {
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub provider: ProviderConfig,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            cache_capacity: 64,
            cache_ttl_secs: 300,
        }
    }
}

impl HistorySettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl StockcastConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: StockcastConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        if f.max_days == 0 {
            return Err(ConfigError::Invalid("forecast.max_days must be positive".into()));
        }
        if f.default_days > f.max_days {
            return Err(ConfigError::Invalid(format!(
                "forecast.default_days ({}) exceeds forecast.max_days ({})",
                f.default_days, f.max_days
            )));
        }
        Ok(())
    }
}
