//! Stateful MACD/signal-line crossover detection.
//!
//! A Buy fires when the MACD line crosses above the signal line, a Sell when
//! it crosses below. A crossing in the same direction as the last non-hold
//! emission is suppressed, so Buy and Sell always alternate.
//!
//! The detector state is an explicit value. Resuming from a saved state on a
//! series that extends the processed prefix yields the same signals as a
//! full-history run.

use crate::domain::Signal;
use crate::error::CoreError;
use crate::indicators::MacdSeries;
use serde::{Deserialize, Serialize};

/// Carried state between incremental calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverState {
    /// Number of bars already consumed.
    pub processed: usize,
    /// Last emitted non-hold signal.
    pub last_signal: Option<Signal>,
}

impl CrossoverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional bias implied by the last emission: +1 after Buy, -1 after
    /// Sell, 0 before any emission.
    pub fn bias(&self) -> i8 {
        self.last_signal.map_or(0, |s| s.as_i8())
    }
}

/// Signals for a processed range plus the state to continue from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBatch {
    /// Signals for bars `[previous.processed, series.len())`.
    pub signals: Vec<Signal>,
    pub state: CrossoverState,
}

/// Generate signals for the full history from a fresh state.
pub fn generate_signals(series: &MacdSeries) -> Vec<Signal> {
    scan(series, CrossoverState::new()).signals
}

/// Continue detection from `state` over the bars it has not seen yet.
///
/// Fails if the series is shorter than what the state has already processed.
pub fn resume(series: &MacdSeries, state: CrossoverState) -> Result<SignalBatch, CoreError> {
    if state.processed > series.len() {
        return Err(CoreError::InvalidData(format!(
            "crossover state has processed {} bars but series has only {}",
            state.processed,
            series.len()
        )));
    }
    Ok(scan(series, state))
}

fn scan(series: &MacdSeries, mut state: CrossoverState) -> SignalBatch {
    let n = series.len();
    let mut signals = Vec::with_capacity(n - state.processed);

    for i in state.processed..n {
        let signal = if i == 0 {
            Signal::Hold
        } else {
            detect(series, i, state.last_signal)
        };
        if !signal.is_hold() {
            state.last_signal = Some(signal);
        }
        signals.push(signal);
    }
    state.processed = n;

    SignalBatch { signals, state }
}

fn detect(series: &MacdSeries, i: usize, last: Option<Signal>) -> Signal {
    let prev = series.sample(i - 1);
    let curr = series.sample(i);
    if !prev.is_defined() || !curr.is_defined() {
        return Signal::Hold;
    }

    if prev.macd <= prev.signal && curr.macd > curr.signal && last != Some(Signal::Buy) {
        Signal::Buy
    } else if prev.macd >= prev.signal && curr.macd < curr.signal && last != Some(Signal::Sell) {
        Signal::Sell
    } else {
        Signal::Hold
    }
}
