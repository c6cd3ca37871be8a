//! Price history acquisition: providers, canonicalization and the on-disk
//! Parquet cache.

pub mod canonicalize;
pub mod circuit_breaker;
pub mod csv_import;
pub mod parquet;
pub mod period;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use canonicalize::{canonicalize, CanonicalReport};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use parquet::{CacheMeta, CacheStatus, ParquetCache};
pub use period::HistoryPeriod;
pub use provider::{DataError, DataSource, FetchResult, HistoryProvider};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
