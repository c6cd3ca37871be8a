//! Yahoo Finance history provider.
//!
//! Fetches daily bars from the v8 chart API with retries, exponential backoff
//! and a shared circuit breaker. Yahoo has no official API and changes its
//! format without notice; the CSV provider is the fallback.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, FetchResult, HistoryProvider};
use crate::domain::PriceBar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

impl QuoteData {
    /// Bar for row `i`, or `None` for the all-null rows Yahoo emits on holidays.
    fn bar_at(&self, i: usize, date: NaiveDate, adj_close: Option<f64>) -> Option<PriceBar> {
        fn pick(col: &[Option<f64>], i: usize) -> Option<f64> {
            col.get(i).copied().flatten()
        }
        let (open, high, low, close) = (
            pick(&self.open, i),
            pick(&self.high, i),
            pick(&self.low, i),
            pick(&self.close, i),
        );
        let volume = self.volume.get(i).copied().flatten();
        if [open, high, low, close].iter().all(Option::is_none) && volume.is_none() {
            return None;
        }
        Some(PriceBar {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            adj_close,
            volume: volume.unwrap_or(0),
        })
    }
}

/// What one HTTP attempt means for the retry loop.
enum Attempt {
    Done(Result<Vec<PriceBar>, DataError>),
    Retry(DataError),
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://query2.finance.yahoo.com";

    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) stockcast/0.1")
            .build()
            .map_err(|e| DataError::Other(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point the provider at another host serving the same chart API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map_or(start_ts, |dt| dt.and_utc().timestamp());
        format!(
            "{}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true",
            self.base_url
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PriceBar>, DataError> {
        let not_found = || DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        };
        let results = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => not_found(),
            Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
            None => DataError::ResponseFormatChanged("chart has neither result nor error".into()),
        })?;
        let data = results.into_iter().next().ok_or_else(not_found)?;

        // A known symbol with no trading days in range has no timestamps.
        let timestamps = data.timestamp.unwrap_or_default();
        let mut indicators = data.indicators;
        if indicators.quote.is_empty() {
            return Err(DataError::ResponseFormatChanged("chart has no quote block".into()));
        }
        let quote = indicators.quote.swap_remove(0);
        let adj: Vec<Option<f64>> = indicators
            .adjclose
            .and_then(|blocks| blocks.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.into_iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::ResponseFormatChanged(format!("bad timestamp {ts}")))?;
            let adj_close = adj.get(i).copied().flatten();
            bars.extend(quote.bar_at(i, date, adj_close));
        }

        if bars.is_empty() {
            return Err(not_found());
        }
        Ok(bars)
    }

    /// Interpret one response. 403 trips the breaker outright; 429 and 5xx
    /// count as failures and retry.
    fn classify(&self, symbol: &str, resp: reqwest::blocking::Response) -> Attempt {
        use reqwest::StatusCode;

        let status = resp.status();
        match status {
            StatusCode::FORBIDDEN => {
                warn!(symbol, "Yahoo returned 403, tripping circuit breaker");
                self.circuit_breaker.trip();
                Attempt::Done(Err(DataError::CircuitBreakerTripped))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(symbol, retry_after_secs, "rate limited by Yahoo");
                Attempt::Retry(DataError::RateLimited { retry_after_secs })
            }
            StatusCode::UNAUTHORIZED => Attempt::Done(Err(DataError::AuthenticationRequired(
                "Yahoo chart API refused the request (401)".into(),
            ))),
            // Unknown tickers still come back with a JSON error body.
            StatusCode::NOT_FOUND => Attempt::Done(match resp.json::<ChartResponse>() {
                Ok(chart) => Self::parse_response(symbol, chart),
                Err(_) => Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }),
            }),
            s if !s.is_success() => {
                self.circuit_breaker.record_failure();
                Attempt::Retry(DataError::Other(format!("HTTP {s} for {symbol}")))
            }
            _ => {
                let parsed = resp
                    .json::<ChartResponse>()
                    .map_err(|e| DataError::ResponseFormatChanged(format!("{symbol}: {e}")))
                    .and_then(|chart| Self::parse_response(symbol, chart));
                if parsed.is_ok() {
                    self.circuit_breaker.record_success();
                }
                Attempt::Done(parsed)
            }
        }
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        let url = self.chart_url(symbol, start, end);
        let mut last_error = DataError::Other(format!("no attempts made for {symbol}"));

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let outcome = match self.client.get(&url).send() {
                Ok(resp) => self.classify(symbol, resp),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    Attempt::Retry(DataError::NetworkUnreachable(e.to_string()))
                }
                Err(e) => Attempt::Done(Err(DataError::NetworkUnreachable(e.to_string()))),
            };
            match outcome {
                Attempt::Done(result) => return result,
                Attempt::Retry(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}

impl HistoryProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let bars = self.fetch_with_retry(symbol, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
