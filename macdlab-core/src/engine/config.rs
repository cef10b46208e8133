//! Simulation configuration.

use crate::domain::params::validate_position_size;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Smallest tradable quantity increment used when none is configured.
pub const DEFAULT_LOT_SIZE: f64 = 1e-8;

/// Account and cost settings for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    /// Commission as a fraction of notional, charged on every fill.
    pub commission: f64,
    /// Quantities are floored to a multiple of this.
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,
    /// A new entry is only allowed while flat. Only `true` is supported.
    #[serde(default = "default_exclusive")]
    pub exclusive_orders: bool,
}

fn default_lot_size() -> f64 {
    DEFAULT_LOT_SIZE
}

fn default_exclusive() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            commission: 0.002,
            lot_size: DEFAULT_LOT_SIZE,
            exclusive_orders: true,
        }
    }
}

impl SimulationConfig {
    pub fn new(initial_cash: f64, commission: f64) -> Self {
        Self {
            initial_cash,
            commission,
            ..Self::default()
        }
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = lot_size;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "initial cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !(self.commission >= 0.0 && self.commission < 1.0) {
            return Err(CoreError::InvalidParameter(format!(
                "commission must be in [0, 1), got {}",
                self.commission
            )));
        }
        if !(self.lot_size.is_finite() && self.lot_size > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "lot size must be positive, got {}",
                self.lot_size
            )));
        }
        if !self.exclusive_orders {
            return Err(CoreError::InvalidParameter(
                "only exclusive (one position at a time) simulation is supported".into(),
            ));
        }
        Ok(())
    }

    /// Validate this config together with a position size fraction.
    pub fn validate_with_size(&self, position_size: f64) -> Result<(), CoreError> {
        self.validate()?;
        validate_position_size(position_size)
    }
}
