//! Data acquisition seam and pair alignment

pub mod align;
pub mod csv_provider;
pub mod provider;
pub mod synthetic;

pub use align::align_pair;
pub use csv_provider::{parse_timestamp, read_close_csv, CsvProvider, DEFAULT_FILE_PATTERN};
pub use provider::{
    DataError, DataSource, InMemoryProvider, PricePoint, PriceProvider, PriceSeries,
};
pub use synthetic::SyntheticProvider;
