//! Domain types for PairLab

pub mod bar;
pub mod pair_series;
pub mod position;
pub mod trade;

pub use bar::PairBar;
pub use pair_series::{PairSeries, SeriesError};
pub use position::Position;
pub use trade::Trade;
