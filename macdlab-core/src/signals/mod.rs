//! Signal generation.
//!
//! Strategies are pure functions of market data: they never see cash,
//! positions or equity. The simulator consumes them through [`Strategy`].

pub mod crossover;
pub mod macd_strategy;

pub use crossover::{generate_signals, resume, CrossoverState, SignalBatch};
pub use macd_strategy::MacdStrategy;

use crate::domain::{Bar, Signal};
use crate::error::CoreError;

/// Capability interface between signal logic and the simulator.
///
/// # Invariants
/// - `generate()` returns exactly one signal per input bar
/// - `generate()` is deterministic for the same bar sequence
pub trait Strategy: Send + Sync {
    /// Strategy name for logs and reports.
    fn name(&self) -> &str;

    /// Leading bars for which the strategy can only emit Hold.
    fn warmup_bars(&self) -> usize;

    /// Minimum series length accepted by a backtest.
    fn min_bars(&self) -> usize;

    /// Fraction of available cash committed per entry, in (0, 1].
    fn position_size(&self) -> f64;

    /// Signals for the whole series, aligned 1:1 with `bars`.
    fn generate(&self, bars: &[Bar]) -> Result<Vec<Signal>, CoreError>;

    /// Signal for the last bar of `window`. Hold for an empty window.
    fn compute_signal(&self, window: &[Bar]) -> Result<Signal, CoreError> {
        Ok(self.generate(window)?.last().copied().unwrap_or_default())
    }
}
