//! PairSeries: the aligned, immutable input to every downstream stage.

use super::bar::PairBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not after the previous bar")]
    Unordered { index: usize, timestamp: String },

    #[error("bar {index} has a non-finite price")]
    VoidBar { index: usize },
}

/// Ordered bars for both assets on one shared time axis.
///
/// Invariants (checked in [`PairSeries::new`]): timestamps strictly increase,
/// and every price is finite. Both legs therefore always have the same length
/// and the same timestamp set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSeries {
    pub asset1: String,
    pub asset2: String,
    bars: Vec<PairBar>,
}

impl PairSeries {
    pub fn new(
        asset1: impl Into<String>,
        asset2: impl Into<String>,
        bars: Vec<PairBar>,
    ) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(SeriesError::VoidBar { index });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::Unordered {
                    index,
                    timestamp: bar.timestamp.to_string(),
                });
            }
        }
        Ok(Self {
            asset1: asset1.into(),
            asset2: asset2.into(),
            bars,
        })
    }

    pub fn bars(&self) -> &[PairBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn prices1(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.price1).collect()
    }

    pub fn prices2(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.price2).collect()
    }

    pub fn spreads(&self) -> Vec<f64> {
        self.bars.iter().map(PairBar::spread).collect()
    }

    /// Keep only bars whose calendar date lies in `[start, end]` (either bound optional).
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let bars = self
            .bars
            .iter()
            .filter(|b| {
                let day = b.timestamp.date();
                start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
            })
            .copied()
            .collect();
        Self {
            asset1: self.asset1.clone(),
            asset2: self.asset2.clone(),
            bars,
        }
    }

    /// Human-readable pair name, e.g. `BTC-ETH`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.asset1, self.asset2)
    }
}
