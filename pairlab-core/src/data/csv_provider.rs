//! CSV provider: reads the close-price dumps written by the exchange downloader.
//!
//! Layout: one file per symbol under a data directory, named by a pattern
//! containing `{symbol}` (default `{symbol}USDT_5m_data.csv`). Each file needs
//! a `timestamp` and a `close` header; every other column is ignored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::provider::{DataError, DataSource, PricePoint, PriceProvider, PriceSeries};

/// Default file name pattern for kline dumps.
pub const DEFAULT_FILE_PATTERN: &str = "{symbol}USDT_5m_data.csv";

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
    file_pattern: String,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_pattern(dir, DEFAULT_FILE_PATTERN)
    }

    pub fn with_pattern(dir: impl Into<PathBuf>, file_pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_pattern: file_pattern.into(),
        }
    }

    /// Path of the file that holds `symbol`.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(self.file_pattern.replace("{symbol}", symbol))
    }
}

impl PriceProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                path: path.display().to_string(),
            });
        }
        let points = read_close_csv(&path)?;
        debug!(symbol, rows = points.len(), path = %path.display(), "loaded csv");
        Ok(PriceSeries::new(symbol, points))
    }
}

/// Read `timestamp`/`close` pairs from a CSV file.
///
/// Close values that do not parse as numbers become NaN and are dropped later
/// by the aligner. A timestamp that does not parse is a hard error.
pub fn read_close_csv(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let path_str = path.display().to_string();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| DataError::MissingColumn {
                column: name.to_string(),
                path: path_str.clone(),
            })
    };
    let ts_col = column("timestamp")?;
    let close_col = column("close")?;

    let mut points = Vec::new();
    let mut coerced = 0usize;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw_ts = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::Parse {
            path: path_str.clone(),
            line,
            reason: format!("unrecognized timestamp '{raw_ts}'"),
        })?;
        let close = record
            .get(close_col)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(f64::NAN);
        if close.is_nan() {
            coerced += 1;
        }
        points.push(PricePoint { timestamp, close });
    }

    if coerced > 0 {
        warn!(path = %path_str, coerced, "non-numeric close values coerced to NaN");
    }
    Ok(points)
}

/// Parse the timestamp formats seen in kline dumps.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, RFC 3339,
/// a bare `YYYY-MM-DD`, or integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|ts| ts.naive_utc())
}
