//! MACD crossover strategy.

use super::crossover::generate_signals;
use super::Strategy;
use crate::domain::{closes, Bar, Signal, StrategyParameters};
use crate::error::CoreError;
use crate::indicators::Macd;

/// Long-only MACD crossover: enter on an upward cross, exit on a downward one.
#[derive(Debug, Clone)]
pub struct MacdStrategy {
    params: StrategyParameters,
    macd: Macd,
    name: String,
}

impl MacdStrategy {
    pub fn new(params: StrategyParameters) -> Result<Self, CoreError> {
        params.validate()?;
        let macd = Macd::new(params.fast_period, params.slow_period, params.signal_period)?;
        Ok(Self {
            params,
            macd,
            name: format!(
                "macd_{}_{}_{}",
                params.fast_period, params.slow_period, params.signal_period
            ),
        })
    }

    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }

    pub fn macd(&self) -> &Macd {
        &self.macd
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        self.macd.lookback()
    }

    fn min_bars(&self) -> usize {
        self.params.min_bars()
    }

    fn position_size(&self) -> f64 {
        self.params.position_size
    }

    fn generate(&self, bars: &[Bar]) -> Result<Vec<Signal>, CoreError> {
        let series = self.macd.compute(&closes(bars));
        Ok(generate_signals(&series))
    }
}
