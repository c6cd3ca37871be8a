//! CSV history import.
//!
//! Reads `{dir}/{SYMBOL}.csv` in the layout Yahoo's download button produces:
//! `Date,Open,High,Low,Close,Adj Close,Volume`. `Adj Close` may be absent;
//! unparsable cells (Yahoo writes `null`) become void bars that
//! canonicalization drops.

use super::provider::{DataError, DataSource, FetchResult, HistoryProvider};
use crate::domain::PriceBar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date", alias = "date")]
    date: NaiveDate,
    #[serde(rename = "Open", alias = "open", deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(rename = "High", alias = "high", deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(rename = "Low", alias = "low", deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(rename = "Close", alias = "close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(
        rename = "Adj Close",
        alias = "adj_close",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    adj_close: Option<f64>,
    #[serde(rename = "Volume", alias = "volume", deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl From<CsvRow> for PriceBar {
    fn from(row: CsvRow) -> Self {
        PriceBar {
            date: row.date,
            open: row.open.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            adj_close: row.adj_close,
            volume: row.volume.map_or(0, |v| v.max(0.0).round() as u64),
        }
    }
}

/// Parse Yahoo-style CSV from any reader.
pub fn read_csv_bars<R: Read>(reader: R) -> Result<Vec<PriceBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| {
            row.map(PriceBar::from)
                .map_err(|e| DataError::Csv(format!("row {}: {e}", i + 1)))
        })
        .collect()
}

/// Serves histories from a directory of per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl HistoryProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            Err(e) => return Err(DataError::Csv(format!("{}: {e}", path.display()))),
        };
        let bars = read_csv_bars(file)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}
