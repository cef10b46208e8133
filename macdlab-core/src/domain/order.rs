//! Orders executed by the simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// A filled market order. All simulated orders fill at the bar close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: OrderSide,
    /// Fractional quantity, already floored to the lot size.
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub bar_index: usize,
    /// Commission paid on this fill, in cash units.
    pub commission: f64,
}

impl Order {
    /// Gross notional value (quantity × price).
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Net cash flow of the fill: negative for buys, positive for sells.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            OrderSide::Buy => -(self.notional() + self.commission),
            OrderSide::Sell => self.notional() - self.commission,
        }
    }
}
