//! Synthetic price paths for demos and tests.
//!
//! Every symbol is one shared common-factor random walk plus a symbol-specific
//! offset and a stationary AR(1) deviation. Any two symbols from the same
//! provider are therefore cointegrated by construction. Paths are fully
//! deterministic given the provider seed and the symbol name.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataSource, PricePoint, PriceProvider, PriceSeries};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    bars: usize,
    start: NaiveDateTime,
    interval: Duration,
    /// AR(1) persistence of the per-symbol deviation (|phi| < 1 keeps it stationary).
    phi: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64, bars: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            seed,
            bars,
            start,
            interval: Duration::minutes(5),
            phi: 0.8,
        }
    }

    pub fn with_start(mut self, start: NaiveDateTime, interval: Duration) -> Self {
        self.start = start;
        self.interval = interval;
        self
    }

    pub fn with_persistence(mut self, phi: f64) -> Self {
        self.phi = phi.clamp(-0.99, 0.99);
        self
    }

    fn common_factor(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut level = 200.0_f64;
        (0..self.bars)
            .map(|_| {
                level += rng.gen_range(-0.5..0.5);
                level
            })
            .collect()
    }

    fn symbol_rng(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        if self.bars == 0 {
            return Err(DataError::InsufficientData(
                "synthetic provider configured with zero bars".into(),
            ));
        }
        let common = self.common_factor();
        let mut rng = self.symbol_rng(symbol);
        let offset: f64 = rng.gen_range(-50.0..50.0);
        let mut deviation = 0.0_f64;

        let points = common
            .iter()
            .enumerate()
            .map(|(i, level)| {
                deviation = self.phi * deviation + rng.gen_range(-1.0..1.0);
                PricePoint {
                    timestamp: self.start + self.interval * i as i32,
                    close: level + offset + deviation,
                }
            })
            .collect();

        Ok(PriceSeries::new(symbol, points))
    }
}
