//! Trade: an entry fill plus an optional exit fill.

use super::order::Order;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A long round trip. Open trades have no exit and no realized PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry: Order,
    pub exit: Option<Order>,
    /// Realized PnL: exit proceeds minus entry cost (both net of commission).
    pub pnl: Option<f64>,
    pub is_open: bool,
}

impl Trade {
    pub fn open(entry: Order) -> Self {
        Self {
            entry,
            exit: None,
            pnl: None,
            is_open: true,
        }
    }

    /// Close the trade with an exit fill and compute realized PnL.
    pub fn close(&mut self, exit: Order) {
        let pnl = exit.cash_flow() - self.cost();
        self.exit = Some(exit);
        self.pnl = Some(pnl);
        self.is_open = false;
    }

    /// Entry cost: notional plus entry commission.
    pub fn cost(&self) -> f64 {
        self.entry.notional() + self.entry.commission
    }

    pub fn quantity(&self) -> f64 {
        self.entry.quantity
    }

    /// Realized return as a fraction of entry cost. `None` while open.
    pub fn return_pct(&self) -> Option<f64> {
        let cost = self.cost();
        match self.pnl {
            Some(pnl) if cost > 0.0 => Some(pnl / cost),
            Some(_) => Some(0.0),
            None => None,
        }
    }

    /// Wall-clock holding time. `None` while open.
    pub fn duration(&self) -> Option<Duration> {
        self.exit
            .as_ref()
            .map(|exit| exit.timestamp - self.entry.timestamp)
    }

    pub fn bars_held(&self) -> Option<usize> {
        self.exit
            .as_ref()
            .map(|exit| exit.bar_index.saturating_sub(self.entry.bar_index))
    }

    pub fn is_winner(&self) -> bool {
        self.pnl.is_some_and(|p| p > 0.0)
    }
}
