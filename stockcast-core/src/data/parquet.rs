//! On-disk Parquet history cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar per symbol. Writes go to `.tmp` and are renamed into place.
//! Partitions that fail validation on load are renamed to `.quarantined`
//! and skipped.

use super::provider::{DataError, DataSource, FetchResult, HistoryProvider};
use crate::domain::PriceBar;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTITION_EXT: &str = "parquet";
const COLUMNS: [&str; 7] = ["date", "open", "high", "low", "close", "adj_close", "volume"];

/// Sidecar written next to a symbol's partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    /// BLAKE3 of the JSON-encoded bars.
    pub data_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

impl CacheMeta {
    fn describe(symbol: &str, bars: &[PriceBar], source: DataSource) -> Result<Self, DataError> {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => return Err(DataError::CacheError("no bars to cache".into())),
        };
        let encoded = serde_json::to_vec(bars)
            .map_err(|e| DataError::CacheError(format!("encode bars for hashing: {e}")))?;
        Ok(Self {
            symbol: symbol.to_string(),
            start_date: first,
            end_date: last,
            bar_count: bars.len(),
            data_hash: blake3::hash(&encoded).to_hex().to_string(),
            source: format!("{source:?}"),
            cached_at: chrono::Local::now().naive_local(),
        })
    }
}

/// One row of `cache status` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

impl CacheStatus {
    fn from_meta(symbol: &str, meta: Option<CacheMeta>) -> Self {
        Self {
            symbol: symbol.to_string(),
            cached: meta.is_some(),
            start_date: meta.as_ref().map(|m| m.start_date),
            end_date: meta.as_ref().map(|m| m.end_date),
            bar_count: meta.map(|m| m.bar_count),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParquetCache {
    root: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("symbol={symbol}"))
    }

    fn meta_file(&self, symbol: &str) -> PathBuf {
        self.partition_dir(symbol).join("meta.json")
    }

    /// Replace the cached bars for `symbol`. `bars` must be sorted by date.
/// Year partitions not covered by `bars` are removed.
    pub fn write(&self, symbol: &str, bars: &[PriceBar], source: DataSource) -> Result<(), DataError> {
        let meta = CacheMeta::describe(symbol, bars, source)?;
        let dir = self.partition_dir(symbol);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("create {}: {e}", dir.display())))?;

        let years = split_by_year(bars);
        let mut written = Vec::with_capacity(years.len());
        for (year, slice) in &years {
            let target = dir.join(format!("{year}.{PARTITION_EXT}"));
            write_partition(&target, slice)?;
            debug!(symbol, year, bars = slice.len(), "wrote partition");
            written.push(target);
        }
        for stale in partition_files(&dir)?.into_iter().filter(|p| !written.contains(p)) {
            fs::remove_file(&stale)
                .map_err(|e| DataError::CacheError(format!("remove {}: {e}", stale.display())))?;
            debug!(symbol, path = %stale.display(), "removed stale partition");
        }

        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("encode meta: {e}")))?;
        fs::write(self.meta_file(symbol), json)
            .map_err(|e| DataError::CacheError(format!("write meta: {e}")))?;

        info!(symbol, bars = bars.len(), partitions = years.len(), "cached history");
        Ok(())
    }

    /// All cached bars for `symbol`, sorted by date.
    pub fn load(&self, symbol: &str) -> Result<Vec<PriceBar>, DataError> {
        let no_data = || DataError::NoCachedData {
            symbol: symbol.to_string(),
        };
        let dir = self.partition_dir(symbol);
        if !dir.is_dir() {
            return Err(no_data());
        }

        let mut bars = Vec::new();
        for path in partition_files(&dir)? {
            match read_partition(&path) {
                Ok(part) => bars.extend(part),
                Err(e) => quarantine(&path, &e),
            }
        }
        if bars.is_empty() {
            return Err(no_data());
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let raw = fs::read(self.meta_file(symbol)).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    /// Symbols that have a partition directory, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix("symbol="))
                    .map(String::from)
            })
            .collect();
        symbols.sort();
        symbols
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| CacheStatus::from_meta(sym, self.get_meta(sym)))
            .collect()
    }
}

impl HistoryProvider for ParquetCache {
    fn name(&self) -> &str {
        "parquet_cache"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let mut bars = self.load(symbol)?;
        bars.retain(|b| (start..=end).contains(&b.date));
        if bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Cache,
        })
    }
}

// ── Partition I/O ───────────────────────────────────────────────────

/// Consecutive runs of sorted bars sharing a calendar year.
fn split_by_year(bars: &[PriceBar]) -> Vec<(i32, &[PriceBar])> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=bars.len() {
        if i == bars.len() || bars[i].date.year() != bars[start].date.year() {
            runs.push((bars[start].date.year(), &bars[start..i]));
            start = i;
        }
    }
    runs
}

fn partition_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let list_err = |e: std::io::Error| DataError::CacheError(format!("list {}: {e}", dir.display()));
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(PARTITION_EXT) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn quarantine(path: &Path, reason: &DataError) {
    warn!(path = %path.display(), error = %reason, "quarantining corrupt cache partition");
    if let Err(e) = fs::rename(path, path.with_extension("parquet.quarantined")) {
        warn!(path = %path.display(), error = %e, "quarantine rename failed");
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn f64_column(name: &str, bars: &[PriceBar], get: impl Fn(&PriceBar) -> f64) -> Column {
    Column::new(name.into(), bars.iter().map(get).collect::<Vec<f64>>())
}

fn frame_from_bars(bars: &[PriceBar]) -> Result<DataFrame, DataError> {
    let base = epoch();
    let day_numbers: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - base).num_days() as i32)
        .collect();
    let dates = Column::new("date".into(), day_numbers)
        .cast(&DataType::Date)
        .map_err(|e| DataError::ParquetError(format!("date column: {e}")))?;
    let adj: Vec<Option<f64>> = bars.iter().map(|b| b.adj_close).collect();
    let volume: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        dates,
        f64_column("open", bars, |b| b.open),
        f64_column("high", bars, |b| b.high),
        f64_column("low", bars, |b| b.low),
        f64_column("close", bars, |b| b.close),
        Column::new("adj_close".into(), adj),
        Column::new("volume".into(), volume),
    ])
    .map_err(|e| DataError::ParquetError(format!("build frame: {e}")))
}

fn write_partition(target: &Path, bars: &[PriceBar]) -> Result<(), DataError> {
    let mut frame = frame_from_bars(bars)?;
    let tmp = target.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp)
        .map_err(|e| DataError::ParquetError(format!("create {}: {e}", tmp.display())))?;
    let written = ParquetWriter::new(file)
        .finish(&mut frame)
        .map_err(|e| DataError::ParquetError(format!("encode {}: {e}", target.display())))
        .and_then(|_| {
            fs::rename(&tmp, target)
                .map_err(|e| DataError::CacheError(format!("rename into place: {e}")))
        });
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn read_partition(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = fs::File::open(path)
        .map_err(|e| DataError::ParquetError(format!("open {}: {e}", path.display())))?;
    let frame = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("decode {}: {e}", path.display())))?;

    if frame.height() == 0 {
        return Err(DataError::ValidationError("partition has no rows".into()));
    }
    if let Some(missing) = COLUMNS.iter().find(|c| frame.column(c).is_err()) {
        return Err(DataError::ValidationError(format!(
            "partition lacks column '{missing}'"
        )));
    }
    bars_from_frame(&frame)
}

fn bars_from_frame(frame: &DataFrame) -> Result<Vec<PriceBar>, DataError> {
    let col = |name: &str| {
        frame
            .column(name)
            .map_err(|e| DataError::ParquetError(format!("column {name}: {e}")))
    };
    let typed = |name: &str, e: PolarsError| DataError::ParquetError(format!("column {name}: {e}"));

    let dates = col("date")?.date().map_err(|e| typed("date", e))?;
    let open = col("open")?.f64().map_err(|e| typed("open", e))?;
    let high = col("high")?.f64().map_err(|e| typed("high", e))?;
    let low = col("low")?.f64().map_err(|e| typed("low", e))?;
    let close = col("close")?.f64().map_err(|e| typed("close", e))?;
    let adj = col("adj_close")?.f64().map_err(|e| typed("adj_close", e))?;
    let volume = col("volume")?.u64().map_err(|e| typed("volume", e))?;

    let base = epoch();
    let mut bars = Vec::with_capacity(frame.height());
    for i in 0..frame.height() {
        let days = dates
            .get(i)
            .ok_or_else(|| DataError::ValidationError(format!("row {i} has no date")))?;
        bars.push(PriceBar {
            date: base + chrono::Duration::days(i64::from(days)),
            open: open.get(i).unwrap_or(f64::NAN),
            high: high.get(i).unwrap_or(f64::NAN),
            low: low.get(i).unwrap_or(f64::NAN),
            close: close.get(i).unwrap_or(f64::NAN),
            adj_close: adj.get(i),
            volume: volume.get(i).unwrap_or(0),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bars() -> Vec<PriceBar> {
        vec![
            PriceBar {
                date: NaiveDate::from_ymd_opt(2023, 12, 29).unwrap(),
                open: 99.0,
                high: 100.0,
                low: 98.0,
                close: 99.5,
                adj_close: None,
                volume: 900,
            },
            PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                adj_close: Some(100.5),
                volume: 1000,
            },
        ]
    }

    #[test]
    fn year_runs_split_on_boundaries() {
        let bars = sample_bars();
        let runs = split_by_year(&bars);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].0, 2023);
        assert_eq!(runs[1].1.len(), 1);
        assert!(split_by_year(&[]).is_empty());
    }

    #[test]
    fn write_and_load_across_year_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();

        assert!(dir.path().join("symbol=SPY/2023.parquet").exists());
        assert!(dir.path().join("symbol=SPY/2024.parquet").exists());
        assert_eq!(cache.load("SPY").unwrap(), sample_bars());
    }

    #[test]
    fn shorter_rewrite_drops_old_years() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();

        let recent = sample_bars()[1..].to_vec();
        cache.write("SPY", &recent, DataSource::YahooFinance).unwrap();

        assert!(!dir.path().join("symbol=SPY/2023.parquet").exists());
        assert_eq!(cache.load("SPY").unwrap(), recent);
        let meta = cache.get_meta("SPY").unwrap();
        assert_eq!(meta.bar_count, 1);
        assert_eq!(meta.start_date, recent[0].date);
    }

    #[test]
    fn writing_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(
            cache.write("SPY", &[], DataSource::Synthetic),
            Err(DataError::CacheError(_))
        ));
    }

    #[test]
    fn unknown_symbol_has_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(
            cache.load("NOPE"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn corrupt_partition_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();
        fs::write(dir.path().join("symbol=SPY/2023.parquet"), b"garbage").unwrap();

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(dir.path().join("symbol=SPY/2023.parquet.quarantined").exists());
    }

    #[test]
    fn status_and_symbol_listing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::Synthetic).unwrap();

        assert_eq!(cache.cached_symbols(), vec!["SPY".to_string()]);
        let statuses = cache.status(&["SPY", "QQQ"]);
        assert!(statuses[0].cached);
        assert_eq!(statuses[0].bar_count, Some(2));
        assert!(!statuses[1].cached);
        assert_eq!(statuses[1].start_date, None);
    }

    #[test]
    fn provider_fetch_filters_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("SPY", &sample_bars(), DataSource::YahooFinance).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let fetched = cache.fetch("SPY", d, d + chrono::Duration::days(30)).unwrap();
        assert_eq!(fetched.bars.len(), 1);
        assert_eq!(fetched.source, DataSource::Cache);
    }
}
