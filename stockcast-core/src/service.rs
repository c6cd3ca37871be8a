//! Forecast service: the boundary object that validates a request, fetches
//! history, loads the model bundle and runs the recursive forecast.

use crate::cache::TtlCache;
use crate::config::{ForecastSettings, ProviderConfig, StockcastConfig};
use crate::data::{
    CircuitBreaker, CsvProvider, HistoryPeriod, HistoryProvider, ParquetCache, SyntheticProvider,
    YahooProvider,
};
use crate::domain::{ForecastResponse, ModelChoice, PriceHistory};
use crate::error::ForecastError;
use crate::features::build_features;
use crate::forecast::forecast_recursive;
use crate::model::{FsArtifactStore, ModelStore};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_SYMBOL_LEN: usize = 20;

/// One forecast request as received from a caller. Fields left unset fall
/// back to the service defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub symbol: String,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ForecastRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            days: None,
            period: None,
            model: None,
        }
    }

    pub fn days(mut self, days: i64) -> Self {
        self.days = Some(days);
        self
    }

    pub fn period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A request after validation and defaulting.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    symbol: String,
    days: u32,
    period: HistoryPeriod,
    model: ModelChoice,
}

pub struct ForecastService {
    provider: Arc<dyn HistoryProvider>,
    models: ModelStore,
    histories: TtlCache<(String, HistoryPeriod, NaiveDate), Arc<PriceHistory>>,
    settings: ForecastSettings,
    as_of: Option<NaiveDate>,
}

impl std::fmt::Debug for ForecastService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastService")
            .field("provider", &self.provider.name())
            .field("models", &self.models)
            .field("settings", &self.settings)
            .field("as_of", &self.as_of)
            .finish()
    }
}

impl ForecastService {
    /// A service with history caching disabled.
    pub fn new(
        provider: Arc<dyn HistoryProvider>,
        models: ModelStore,
        settings: ForecastSettings,
    ) -> Self {
        Self {
            provider,
            models,
            histories: TtlCache::disabled(),
            settings,
            as_of: None,
        }
    }

    /// Build the provider, model store and caches described by `config`.
    pub fn from_config(config: &StockcastConfig) -> Result<Self, ForecastError> {
        let provider: Arc<dyn HistoryProvider> = match &config.history.provider {
            ProviderConfig::Yahoo => Arc::new(YahooProvider::new(Arc::new(
                CircuitBreaker::default_provider(),
            ))?),
            ProviderConfig::Csv { dir } => Arc::new(CsvProvider::new(dir)),
            ProviderConfig::Synthetic => Arc::new(SyntheticProvider::new()),
            ProviderConfig::Parquet { dir } => Arc::new(ParquetCache::new(dir)),
        };
        let models = ModelStore::new(FsArtifactStore::new(&config.models.dir)).with_cache(
            TtlCache::new(config.models.cache_capacity, config.models.cache_ttl()),
        );
        info!(
            provider = provider.name(),
            models = %config.models.dir.display(),
            "forecast service ready"
        );
        Ok(Self::new(provider, models, config.forecast.clone()).with_history_cache(
            TtlCache::new(config.history.cache_capacity, config.history.cache_ttl()),
        ))
    }

    pub fn with_history_cache(
        mut self,
        cache: TtlCache<(String, HistoryPeriod, NaiveDate), Arc<PriceHistory>>,
    ) -> Self {
        debug!(capacity = cache.capacity(), ttl = ?cache.ttl(), "history cache configured");
        self.histories = cache;
        self
    }

    /// Pin the date history windows end at. Defaults to today's local date.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn resolve(&self, req: &ForecastRequest) -> Result<Resolved, ForecastError> {
        let symbol = req.symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(ForecastError::InvalidInput("symbol must not be empty".into()));
        }
        if symbol.len() > MAX_SYMBOL_LEN
            || !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        {
            return Err(ForecastError::InvalidInput(format!(
                "'{}' is not a valid ticker symbol",
                req.symbol
            )));
        }

        let days = req.days.unwrap_or(i64::from(self.settings.default_days));
        if days < 0 {
            return Err(ForecastError::InvalidInput(format!(
                "days must not be negative (got {days})"
            )));
        }
        let max = self.settings.max_days;
        let days = u32::try_from(days)
            .ok()
            .filter(|d| *d <= max)
            .ok_or_else(|| {
                ForecastError::InvalidInput(format!("days must be at most {max} (got {days})"))
            })?;

        let period = match &req.period {
            Some(p) => p.parse::<HistoryPeriod>().map_err(ForecastError::InvalidInput)?,
            None => self.settings.default_period,
        };
        let model = match &req.model {
            Some(m) => m.parse::<ModelChoice>().map_err(ForecastError::InvalidInput)?,
            None => ModelChoice::default(),
        };

        Ok(Resolved {
            symbol,
            days,
            period,
            model,
        })
    }

    /// Validated price history for `symbol`, from cache or the provider.
    pub fn history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Arc<PriceHistory>, ForecastError> {
        let end = self.as_of();
        let start = period.start_date(end);
        let key = (symbol.to_string(), period, end);
        self.histories.get_or_try_insert_with(key, || -> Result<_, ForecastError> {
            let fetched = self.provider.fetch(symbol, start, end)?;
            let source = fetched.source;
            let (history, report) = fetched.into_history()?;
            if report.changed_anything() {
                debug!(symbol, ?report, "canonicalized fetched bars");
            }
            info!(
                symbol,
                ?source,
                bars = history.len(),
                first = %history.first_date(),
                last = %history.last_date(),
                "fetched history"
            );
            Ok(Arc::new(history))
        })
    }

    /// Run one forecast end to end.
    pub fn forecast(&self, req: &ForecastRequest) -> Result<ForecastResponse, ForecastError> {
        let r = self.resolve(req)?;
        let history = self.history(&r.symbol, r.period)?;
        let rows = build_features(history.bars());
        let bundle = self.models.load(r.model)?;
        let forecast = forecast_recursive(&rows, &bundle, r.days)?;

        info!(
            symbol = %r.symbol,
            model = %r.model,
            days = r.days,
            feature_rows = rows.len(),
            "forecast complete"
        );
        Ok(ForecastResponse::new(r.symbol, &bundle.artifact_name, &forecast))
    }

    /// Run independent forecasts in parallel. Results keep request order.
    pub fn forecast_many(
        &self,
        requests: &[ForecastRequest],
    ) -> Vec<Result<ForecastResponse, ForecastError>> {
        requests.par_iter().map(|req| self.forecast(req)).collect()
    }
}
