//! Serializable backtest configuration (TOML).
//!
//! ```toml
//! [backtest]
//! symbol = "BTCUSDT"
//! interval = "1h"
//! initial_cash = 10000.0
//! commission = 0.002
//!
//! [strategy]
//! fast_period = 12
//! slow_period = 26
//! signal_period = 9
//! position_size = 0.8
//!
//! [optimize]
//! fast = { start = 8, end = 15 }
//! objective = "Return"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::StrategyParameters;
use macdlab_core::engine::{SimulationConfig, DEFAULT_LOT_SIZE};

use crate::data::interval_duration;
use crate::objective::Objective;
use crate::optimizer::{ParamRange, SearchSpace};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub optimize: Option<OptimizeSection>,
    #[serde(default)]
    pub data: DataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    pub interval: String,
    pub initial_cash: f64,
    pub commission: f64,
    pub lot_size: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
            initial_cash: 10_000.0,
            commission: 0.002,
            lot_size: DEFAULT_LOT_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub position_size: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let p = StrategyParameters::default();
        Self {
            fast_period: p.fast_period,
            slow_period: p.slow_period,
            signal_period: p.signal_period,
            position_size: p.position_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeSection {
    pub fast: ParamRange,
    pub slow: ParamRange,
    pub signal: ParamRange,
    pub position_sizes: Vec<f64>,
    pub objective: String,
    /// Worker threads; unset means one per core.
    pub threads: Option<usize>,
}

impl Default for OptimizeSection {
    fn default() -> Self {
        let space = SearchSpace::default();
        Self {
            fast: space.fast,
            slow: space.slow,
            signal: space.signal,
            position_sizes: space.position_sizes,
            objective: Objective::default().report_key().to_string(),
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory of the CSV bar store.
    pub store_dir: Option<PathBuf>,
    /// RFC 3339 bounds of the bar range to load, e.g. `"2024-01-01T00:00:00Z"`.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(format!("serialize config: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: &dyn std::fmt::Display| ConfigError::Invalid(e.to_string());

        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("backtest.symbol must not be empty".into()));
        }
        interval_duration(&self.backtest.interval).map_err(|e| invalid(&e))?;
        self.simulation_config()
            .validate_with_size(self.strategy.position_size)
            .map_err(|e| invalid(&e))?;
        self.strategy_params().validate().map_err(|e| invalid(&e))?;

        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "data.start ({start}) must be before data.end ({end})"
                )));
            }
        }

        if let Some(opt) = &self.optimize {
            opt.search_space().validate().map_err(|e| invalid(&e))?;
            opt.objective().map_err(|e| invalid(&e))?;
            if opt.threads == Some(0) {
                return Err(ConfigError::Invalid("optimize.threads must be positive".into()));
            }
        }
        Ok(())
    }

    pub fn strategy_params(&self) -> StrategyParameters {
        StrategyParameters::new(
            self.strategy.fast_period,
            self.strategy.slow_period,
            self.strategy.signal_period,
            self.strategy.position_size,
        )
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.backtest.initial_cash, self.backtest.commission)
            .with_lot_size(self.backtest.lot_size)
    }
}

impl OptimizeSection {
    pub fn search_space(&self) -> SearchSpace {
        SearchSpace {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
            position_sizes: self.position_sizes.clone(),
        }
    }

    pub fn objective(&self) -> Result<Objective, crate::objective::UnknownObjective> {
        self.objective.parse()
    }
}
