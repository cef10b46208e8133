//! Strategy parameters shared by the indicator, signal and sizing stages.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MACD periods plus the fraction of cash committed per entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub position_size: f64,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            position_size: 0.8,
        }
    }
}

impl StrategyParameters {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize, position_size: f64) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
            position_size,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_periods(self.fast_period, self.slow_period, self.signal_period)?;
        validate_position_size(self.position_size)
    }

    /// Minimum number of bars a backtest needs: slow + signal + 1.
    pub fn min_bars(&self) -> usize {
        self.slow_period + self.signal_period + 1
    }
}

impl fmt::Display for StrategyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MACD({},{},{}) size={}",
            self.fast_period, self.slow_period, self.signal_period, self.position_size
        )
    }
}

pub fn validate_periods(fast: usize, slow: usize, signal: usize) -> Result<(), CoreError> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Err(CoreError::InvalidParameter(format!(
            "MACD periods must be positive, got fast={fast} slow={slow} signal={signal}"
        )));
    }
    if fast >= slow {
        return Err(CoreError::InvalidParameter(format!(
            "fast period ({fast}) must be less than slow period ({slow})"
        )));
    }
    Ok(())
}

pub fn validate_position_size(size: f64) -> Result<(), CoreError> {
    if !(size > 0.0 && size <= 1.0) {
        return Err(CoreError::InvalidParameter(format!(
            "position_size must be in (0, 1], got {size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_classic_macd() {
        let p = StrategyParameters::default();
        assert_eq!((p.fast_period, p.slow_period, p.signal_period), (12, 26, 9));
        assert_eq!(p.position_size, 0.8);
        assert!(p.validate().is_ok());
        assert_eq!(p.min_bars(), 36);
    }

    #[test]
    fn rejects_fast_not_below_slow() {
        assert!(StrategyParameters::new(26, 26, 9, 0.5).validate().is_err());
        assert!(StrategyParameters::new(30, 26, 9, 0.5).validate().is_err());
    }

    #[test]
    fn rejects_zero_periods() {
        assert!(StrategyParameters::new(0, 26, 9, 0.5).validate().is_err());
        assert!(StrategyParameters::new(12, 26, 0, 0.5).validate().is_err());
    }

    #[test]
    fn position_size_bounds() {
        assert!(StrategyParameters::new(12, 26, 9, 1.0).validate().is_ok());
        assert!(StrategyParameters::new(12, 26, 9, 0.0).validate().is_err());
        assert!(StrategyParameters::new(12, 26, 9, 1.01).validate().is_err());
        assert!(StrategyParameters::new(12, 26, 9, f64::NAN).validate().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(StrategyParameters::default().to_string(), "MACD(12,26,9) size=0.8");
    }
}
