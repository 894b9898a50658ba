//! Serializable backtest configuration.
//!
//! Loaded from TOML. Every section except `[pair]` has defaults, so the
//! smallest valid file names just the two assets.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::data::DEFAULT_FILE_PATTERN;
use pairlab_core::engine::{CostModel, SignalParams, DEFAULT_EXIT_FLOOR, DEFAULT_INITIAL_CAPITAL};
use pairlab_core::stats::DEFAULT_SIGNIFICANCE;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Complete configuration for one pair backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub pair: PairConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub costs: CostsConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub cointegration: CointegrationConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub asset1: String,
    pub asset2: String,
    /// Inclusive, by calendar date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub exit_floor: f64,
    pub window: usize,
    /// Reserved; carried into manifests, never consulted.
    pub stop_loss: f64,
    /// Reserved; carried into manifests, never consulted.
    pub cooldown: usize,
    /// `false` selects the fee-naive entry rule.
    pub fee_aware_entries: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            entry_threshold: 2.0,
            exit_threshold: 0.3,
            exit_floor: DEFAULT_EXIT_FLOOR,
            window: 60,
            stop_loss: 0.0,
            cooldown: 0,
            fee_aware_entries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostsConfig {
    pub fee_rate: f64,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self { fee_rate: 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CointegrationConfig {
    pub enabled: bool,
    pub significance: f64,
}

impl Default for CointegrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub file_pattern: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/fechamentos"),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
        }
    }
}

impl BacktestConfig {
    /// Config for `asset1`/`asset2` with every other section at its default.
    pub fn for_pair(asset1: impl Into<String>, asset2: impl Into<String>) -> Self {
        Self {
            pair: PairConfig {
                asset1: asset1.into(),
                asset2: asset2.into(),
                start_date: None,
                end_date: None,
            },
            strategy: StrategyConfig::default(),
            costs: CostsConfig::default(),
            backtest: BacktestSettings::default(),
            cointegration: CointegrationConfig::default(),
            data: DataConfig::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pair;
        if p.asset1.trim().is_empty() || p.asset2.trim().is_empty() {
            return Err(invalid("pair", "asset symbols must not be empty"));
        }
        if p.asset1 == p.asset2 {
            return Err(invalid("pair", format!("asset1 and asset2 are both '{}'", p.asset1)));
        }
        if let (Some(start), Some(end)) = (p.start_date, p.end_date) {
            if start > end {
                return Err(invalid("pair.start_date", format!("{start} is after {end}")));
            }
        }

        let s = &self.strategy;
        if s.window < 2 {
            return Err(invalid("strategy.window", format!("must be at least 2, got {}", s.window)));
        }
        if !(s.entry_threshold.is_finite() && s.entry_threshold > 0.0) {
            return Err(invalid(
                "strategy.entry_threshold",
                format!("must be positive and finite, got {}", s.entry_threshold),
            ));
        }
        if !s.exit_threshold.is_finite() {
            return Err(invalid(
                "strategy.exit_threshold",
                format!("must be finite, got {}", s.exit_threshold),
            ));
        }
        if !s.exit_floor.is_finite() || s.exit_floor >= s.exit_threshold {
            return Err(invalid(
                "strategy.exit_floor",
                format!("must be finite and below exit_threshold, got {}", s.exit_floor),
            ));
        }

        self.cost_model()?;

        if !(self.backtest.initial_capital.is_finite() && self.backtest.initial_capital > 0.0) {
            return Err(invalid(
                "backtest.initial_capital",
                format!("must be positive, got {}", self.backtest.initial_capital),
            ));
        }
        if !self.backtest.risk_free_rate.is_finite() {
            return Err(invalid("backtest.risk_free_rate", "must be finite"));
        }

        let sig = self.cointegration.significance;
        if !(sig > 0.0 && sig < 1.0) {
            return Err(invalid(
                "cointegration.significance",
                format!("must be in (0, 1), got {sig}"),
            ));
        }
        Ok(())
    }

    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            entry_threshold: self.strategy.entry_threshold,
            exit_threshold: self.strategy.exit_threshold,
            exit_floor: self.strategy.exit_floor,
            stop_loss: self.strategy.stop_loss,
            cooldown: self.strategy.cooldown,
        }
    }

    pub fn cost_model(&self) -> Result<CostModel, ConfigError> {
        CostModel::new(self.costs.fee_rate).map_err(|e| invalid("costs.fee_rate", e.to_string()))
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share the same RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[pair]
asset1 = "BTC"
asset2 = "ETH"
start_date = "2024-01-01"
end_date = "2024-12-31"

[strategy]
entry_threshold = 2.0
exit_threshold = 0.3
window = 60
stop_loss = 0.0
cooldown = 0
fee_aware_entries = true

[costs]
fee_rate = 0.01

[backtest]
initial_capital = 10000.0
risk_free_rate = 0.0

[cointegration]
enabled = true
significance = 0.05

[data]
dir = "data/fechamentos"
file_pattern = "{symbol}USDT_5m_data.csv"
"#;

    #[test]
    fn parses_full_file() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.pair.asset1, "BTC");
        assert_eq!(config.pair.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(config.strategy.window, 60);
        assert!(config.cointegration.enabled);
        assert_eq!(config.data.file_pattern, "{symbol}USDT_5m_data.csv");
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let config = BacktestConfig::from_toml("[pair]\nasset1 = \"A\"\nasset2 = \"B\"\n").unwrap();
        assert_eq!(config, BacktestConfig::for_pair("A", "B"));
        assert_eq!(config.costs.fee_rate, 0.01);
        assert_eq!(config.backtest.initial_capital, 10_000.0);
        assert_eq!(config.strategy.exit_floor, -0.5);
    }

    #[test]
    fn partial_section_fills_remaining_fields() {
        let config =
            BacktestConfig::from_toml("[pair]\nasset1 = \"A\"\nasset2 = \"B\"\n[strategy]\nwindow = 20\n")
                .unwrap();
        assert_eq!(config.strategy.window, 20);
        assert_eq!(config.strategy.entry_threshold, 2.0);
    }

    #[test]
    fn missing_pair_is_parse_error() {
        assert!(matches!(
            BacktestConfig::from_toml("[strategy]\nwindow = 20\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        fn window(c: &mut BacktestConfig) {
            c.strategy.window = 1;
        }
        fn entry(c: &mut BacktestConfig) {
            c.strategy.entry_threshold = 0.0;
        }
        fn exit(c: &mut BacktestConfig) {
            c.strategy.exit_threshold = f64::NAN;
        }
        fn fee(c: &mut BacktestConfig) {
            c.costs.fee_rate = 1.0;
        }
        fn capital(c: &mut BacktestConfig) {
            c.backtest.initial_capital = -5.0;
        }
        fn significance(c: &mut BacktestConfig) {
            c.cointegration.significance = 1.0;
        }
        fn same_asset(c: &mut BacktestConfig) {
            c.pair.asset2 = c.pair.asset1.clone();
        }
        fn reversed_dates(c: &mut BacktestConfig) {
            c.pair.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
            c.pair.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        }

        let cases: [(&str, fn(&mut BacktestConfig)); 8] = [
            ("strategy.window", window),
            ("strategy.entry_threshold", entry),
            ("strategy.exit_threshold", exit),
            ("costs.fee_rate", fee),
            ("backtest.initial_capital", capital),
            ("cointegration.significance", significance),
            ("pair", same_asset),
            ("pair.start_date", reversed_dates),
        ];
        for (field, mutate) in cases {
            let mut config = BacktestConfig::for_pair("A", "B");
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected invalid {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn exit_at_the_mean_is_valid() {
        let mut config = BacktestConfig::for_pair("A", "B");
        config.strategy.exit_threshold = 0.0;
        assert!(config.validate().is_ok());

        config.strategy.exit_threshold = -0.5;
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "strategy.exit_floor"),
            other => panic!("empty exit band accepted: {other:?}"),
        }
    }

    #[test]
    fn run_id_deterministic_and_param_sensitive() {
        let a = BacktestConfig::for_pair("A", "B");
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        b.strategy.entry_threshold = 2.5;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
    }

    #[test]
    fn toml_roundtrip() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn signal_params_carry_reserved_fields() {
        let mut config = BacktestConfig::for_pair("A", "B");
        config.strategy.stop_loss = 0.1;
        config.strategy.cooldown = 5;
        let params = config.signal_params();
        assert_eq!(params.stop_loss, 0.1);
        assert_eq!(params.cooldown, 5);
    }
}
