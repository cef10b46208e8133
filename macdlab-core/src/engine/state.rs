//! Per-run mutable state and the run result.

use crate::domain::{EquityPoint, PositionState, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable state that evolves bar-by-bar during one simulation.
///
/// Scoped to a single run; nothing here outlives `run_simulation`.
#[derive(Debug, Clone)]
pub struct RunState {
    pub cash: f64,
    pub quantity: f64,
    pub position: PositionState,
    pub open_trade: Option<Trade>,
    pub closed_trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Non-hold signals seen.
    pub signal_count: usize,
    /// Buy signals that could not be filled (zero quantity or not enough cash).
    pub skipped_entries: usize,
}

impl RunState {
    pub fn new(initial_cash: f64, capacity: usize) -> Self {
        Self {
            cash: initial_cash,
            quantity: 0.0,
            position: PositionState::Flat,
            open_trade: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::with_capacity(capacity),
            signal_count: 0,
            skipped_entries: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position == PositionState::Flat
    }

    /// Append the mark-to-market point for a bar close.
    pub fn mark(&mut self, timestamp: DateTime<Utc>, close: f64) -> f64 {
        let point = EquityPoint::mark(timestamp, self.cash, self.quantity, close);
        let equity = point.equity;
        self.equity_curve.push(point);
        equity
    }

    pub fn into_result(self, initial_cash: f64) -> RunResult {
        let final_equity = self
            .equity_curve
            .last()
            .map_or(initial_cash, |p| p.equity);
        let mut trades = self.closed_trades;
        trades.extend(self.open_trade);
        RunResult {
            initial_cash,
            final_equity,
            final_cash: self.cash,
            trades,
            equity_curve: self.equity_curve,
            signal_count: self.signal_count,
            skipped_entries: self.skipped_entries,
        }
    }
}

/// Result of a complete simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_cash: f64,
    pub final_equity: f64,
    pub final_cash: f64,
    /// All trades in entry order. At most the last one is open.
    pub trades: Vec<Trade>,
    /// One point per bar.
    pub equity_curve: Vec<EquityPoint>,
    pub signal_count: usize,
    pub skipped_entries: usize,
}

impl RunResult {
    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.is_open)
    }

    pub fn open_trade(&self) -> Option<&Trade> {
        self.trades.iter().find(|t| t.is_open)
    }

    pub fn bar_count(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.equity_curve.first().map(|p| p.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.equity_curve.last().map(|p| p.timestamp)
    }
}
