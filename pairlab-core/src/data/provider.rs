//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over where close prices come from (CSV
//! dumps written by the exchange downloader, synthetic paths) so the engine
//! never sees a file path and tests can inject data directly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SeriesError;

/// One raw close observation from a provider (before alignment).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Raw close series for a single symbol, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("no data for symbol '{symbol}' at {path}")]
    NotFound { symbol: String, path: String },

    #[error("missing column '{column}' in {path}")]
    MissingColumn { column: String, path: String },

    #[error("parse error in {path} line {line}: {reason}")]
    Parse {
        path: String,
        line: u64,
        reason: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    CsvImport,
    Synthetic,
    InMemory,
}

/// Trait for price providers.
///
/// Implementations return the full close history they hold for `symbol`;
/// alignment and date-range filtering happen above this trait.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Provenance tag stamped on results built from this provider's data.
    fn source(&self) -> DataSource;

    /// Fetch the close series for a symbol.
    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError>;
}

/// Provider over series already held in memory. Handy for tests and callers
/// that acquire data themselves.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: Vec<PriceSeries>,
}

impl InMemoryProvider {
    pub fn new(series: Vec<PriceSeries>) -> Self {
        Self { series }
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.retain(|s| s.symbol != series.symbol);
        self.series.push(series);
    }
}

impl PriceProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn source(&self) -> DataSource {
        DataSource::InMemory
    }

    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        self.series
            .iter()
            .find(|s| s.symbol == symbol)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                symbol: symbol.to_string(),
                path: "memory".into(),
            })
    }
}
