//! Equity curve points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mark-to-market snapshot recorded after every bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub position_qty: f64,
    /// position_qty × close of the bar.
    pub position_value: f64,
    pub equity: f64,
}

impl EquityPoint {
    pub fn mark(timestamp: DateTime<Utc>, cash: f64, position_qty: f64, close: f64) -> Self {
        let position_value = position_qty * close;
        Self {
            timestamp,
            cash,
            position_qty,
            position_value,
            equity: cash + position_value,
        }
    }

    pub fn in_market(&self) -> bool {
        self.position_qty > 0.0
    }
}
