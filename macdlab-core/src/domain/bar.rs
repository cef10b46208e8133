//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// OHLCV bar for a single symbol at a single sampling instant.
///
/// Volume is fractional because crypto venues report base-asset volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if every price field is finite and strictly positive.
    pub fn has_valid_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if !self.has_valid_prices() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Validate a bar series for simulation.
///
/// Rejects non-finite or non-positive prices and timestamps that are not
/// strictly increasing (duplicates included).
pub fn validate_series(bars: &[Bar]) -> Result<(), CoreError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.has_valid_prices() {
            return Err(CoreError::InvalidData(format!(
                "bar {i} at {} has a non-positive or non-finite price",
                bar.timestamp
            )));
        }
    }
    if let Some(i) = bars
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
    {
        return Err(CoreError::InvalidData(format!(
            "timestamps not strictly increasing at bar {}: {} follows {}",
            i + 1,
            bars[i + 1].timestamp,
            bars[i].timestamp
        )));
    }
    Ok(())
}

/// Extract the close-price column.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
