//! Stockcast CLI: forecast, download, cache and model commands.
//!
//! Commands:
//! - `forecast`: predict the next N daily closes, printed as JSON
//! - `download`: fetch history from Yahoo Finance and cache as Parquet
//! - `cache status`: report cached symbols and date ranges
//! - `models verify`: load every model bundle and report the outcome
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); stdout carries only
//! command output.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockcast_core::config::ProviderConfig;
use stockcast_core::data::{
    CircuitBreaker, DataSource, HistoryPeriod, HistoryProvider, ParquetCache, YahooProvider,
};
use stockcast_core::model::{FsArtifactStore, ModelStore};
use stockcast_core::{ErrorResponse, ForecastRequest, ForecastService, StockcastConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "stockcast", about = "Stockcast CLI: daily close forecasts from price history")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next N daily closes for one symbol.
    Forecast {
        /// Ticker symbol (e.g., AAPL, ^GSPC).
        symbol: String,

        /// Days to forecast. Defaults to the configured default (7).
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,

        /// History period: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max.
        #[arg(long)]
        period: Option<String>,

        /// Model: lstm or xgb. Defaults to lstm.
        #[arg(long)]
        model: Option<String>,

        /// Path to stockcast.toml. Missing file means defaults.
        #[arg(long, default_value = "stockcast.toml")]
        config: PathBuf,

        /// Model artifact directory (overrides config).
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Offline mode: read history from the Parquet cache only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Cache directory used with --offline.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Download history from Yahoo Finance and cache as Parquet.
    Download {
        /// Symbols to download (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// How much history to fetch.
        #[arg(long, default_value = "5y")]
        period: HistoryPeriod,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Model artifact commands.
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges and bar counts.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ModelsAction {
    /// Load and validate every model bundle.
    Verify {
        /// Model artifact directory. Defaults to ./model.
        #[arg(long, default_value = "model")]
        model_dir: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Forecast {
            symbol,
            days,
            period,
            model,
            config,
            model_dir,
            offline,
            cache_dir,
        } => {
            let mut request = ForecastRequest::new(symbol);
            request.days = days;
            request.period = period;
            request.model = model;
            run_forecast(request, &config, model_dir, offline.then_some(cache_dir))
        }
        Commands::Download {
            symbols,
            period,
            cache_dir,
        } => run_download(&symbols, period, cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
        Commands::Models { action } => match action {
            ModelsAction::Verify { model_dir } => run_models_verify(model_dir),
        },
    }
}

fn run_forecast(
    request: ForecastRequest,
    config_path: &Path,
    model_dir: Option<PathBuf>,
    offline_cache: Option<PathBuf>,
) -> Result<()> {
    let mut config = StockcastConfig::load_or_default(config_path)?;
    if let Some(dir) = model_dir {
        config.models.dir = dir;
    }
    if let Some(dir) = offline_cache {
        config.history.provider = ProviderConfig::Parquet { dir };
    }

    let service = ForecastService::from_config(&config)?;
    match service.forecast(&request) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!(symbol = %request.symbol, error = %e, "forecast failed");
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::new(&e))?);
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }
}

fn run_download(symbols: &[String], period: HistoryPeriod, cache_dir: PathBuf) -> Result<()> {
    let end = chrono::Local::now().date_naive();
    let start = period.start_date(end);

    let provider = YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    let cache = ParquetCache::new(cache_dir);

    let mut failures = Vec::new();
    for raw in symbols {
        let symbol = raw.trim().to_ascii_uppercase();
        if !provider.is_available() {
            warn!(symbol = %symbol, "provider unavailable, skipping");
            failures.push((symbol, "circuit breaker open".to_string()));
            continue;
        }
        let outcome = provider
            .fetch(&symbol, start, end)
            .and_then(|fetched| fetched.into_history())
            .and_then(|(history, _)| cache.write(&symbol, history.bars(), DataSource::YahooFinance));
        match outcome {
            Ok(()) => info!(symbol = %symbol, %start, %end, "downloaded"),
            Err(e) => {
                error!(symbol = %symbol, error = %e, "download failed");
                failures.push((symbol, e.to_string()));
            }
        }
    }

    if !failures.is_empty() {
        for (sym, err) in &failures {
            eprintln!("Error for {sym}: {err}");
        }
        bail!("{} of {} downloads failed", failures.len(), symbols.len());
    }
    println!("Cached {} symbol(s) in {}", symbols.len(), cache.cache_dir().display());
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.cached_symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!("{:<10} {:<25} {:>8}", "Symbol", "Date Range", "Bars");
    println!("{}", "-".repeat(45));
    for status in cache.status(&refs) {
        let range = match (status.start_date, status.end_date) {
            (Some(s), Some(e)) => format!("{s} to {e}"),
            _ => "(no meta)".to_string(),
        };
        let bars = status.bar_count.map_or("-".to_string(), |n| n.to_string());
        println!("{:<10} {:<25} {:>8}", status.symbol, range, bars);
    }
    Ok(())
}

fn run_models_verify(model_dir: PathBuf) -> Result<()> {
    let store = ModelStore::new(FsArtifactStore::new(model_dir));
    println!("Models: {}", store.describe());

    let mut failed = 0;
    for (choice, outcome) in store.verify_all() {
        match outcome {
            Ok(bundle) => println!(
                "  {:<5} ok    lookback={} regressor={} fingerprint={}",
                choice.id(),
                bundle.lookback,
                bundle.regressor.name(),
                &bundle.fingerprint[..12]
            ),
            Err(e) => {
                failed += 1;
                println!("  {:<5} FAIL  {e}", choice.id());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} model(s) failed verification");
    }
    Ok(())
}
