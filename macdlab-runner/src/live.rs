//! Live trading adapter.
//!
//! `LiveTrader` consumes bars one at a time, carries the crossover state
//! between calls and turns Buy/Sell signals into market orders on an
//! `ExecutionClient`. Position rules match the backtest: long-only, enter
//! from Flat on Buy, exit the whole position on Sell.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use macdlab_core::domain::{closes, Bar, OrderSide, PositionState, Signal, StrategyParameters};
use macdlab_core::engine::{floor_to_lot, DEFAULT_LOT_SIZE};
use macdlab_core::indicators::Macd;
use macdlab_core::signals::{resume, CrossoverState};
use macdlab_core::CoreError;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("bar at {got} does not follow the last bar at {last}")]
    OutOfOrderBar {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit { limit_price: f64 },
}

/// Broker response to a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    Filled { quantity: f64, price: f64 },
    /// Accepted but not yet filled.
    Accepted { order_id: String },
    Rejected { reason: String },
}

/// A broker connection.
pub trait ExecutionClient {
    fn submit_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        side: OrderSide,
        order_type: OrderType,
    ) -> Result<OrderStatus, LiveError>;

    /// Cash available for new entries.
    fn available_cash(&self) -> Result<f64, LiveError>;

    /// Commission charged per fill, as a fraction of notional.
    fn commission_rate(&self) -> f64 {
        0.0
    }

    /// Latest traded price for a symbol. Brokers with their own feed ignore it.
    fn on_price(&mut self, _symbol: &str, _price: f64) {}
}

// ─── Paper client ───────────────────────────────────────────────────

/// A submitted order as recorded by the paper client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub order_type: OrderType,
    pub status: OrderStatus,
}

/// In-memory broker that fills market orders at the last seen price.
///
/// Limit orders are accepted and left pending; nothing ever fills them.
#[derive(Debug, Clone)]
pub struct PaperExecutionClient {
    cash: f64,
    commission: f64,
    positions: HashMap<String, f64>,
    prices: HashMap<String, f64>,
    orders: Vec<PaperOrder>,
}

impl PaperExecutionClient {
    pub fn new(cash: f64, commission: f64) -> Self {
        Self {
            cash,
            commission,
            positions: HashMap::new(),
            prices: HashMap::new(),
            orders: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn orders(&self) -> &[PaperOrder] {
        &self.orders
    }

    /// Cash plus positions marked at the last seen prices.
    pub fn equity(&self) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .map(|(s, q)| q * self.prices.get(s).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    fn fill(&mut self, symbol: &str, quantity: f64, side: OrderSide) -> OrderStatus {
        let Some(&price) = self.prices.get(symbol) else {
            return OrderStatus::Rejected {
                reason: format!("no price for {symbol}"),
            };
        };
        let notional = quantity * price;
        let commission = notional * self.commission;
        match side {
            OrderSide::Buy => {
                let debit = notional + commission;
                if debit > self.cash {
                    return OrderStatus::Rejected {
                        reason: format!("insufficient cash: need {debit:.2}, have {:.2}", self.cash),
                    };
                }
                self.cash -= debit;
                *self.positions.entry(symbol.to_string()).or_default() += quantity;
            }
            OrderSide::Sell => {
                let held = self.position(symbol);
                if quantity > held {
                    return OrderStatus::Rejected {
                        reason: format!("insufficient position: selling {quantity}, holding {held}"),
                    };
                }
                self.cash += notional - commission;
                self.positions.insert(symbol.to_string(), held - quantity);
            }
        }
        OrderStatus::Filled { quantity, price }
    }
}

impl ExecutionClient for PaperExecutionClient {
    fn submit_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        side: OrderSide,
        order_type: OrderType,
    ) -> Result<OrderStatus, LiveError> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(LiveError::Execution(format!("invalid order quantity {quantity}")));
        }
        let order_id = format!("paper-{}", self.orders.len() + 1);
        let status = match order_type {
            OrderType::Market => self.fill(symbol, quantity, side),
            OrderType::Limit { .. } => OrderStatus::Accepted {
                order_id: order_id.clone(),
            },
        };
        self.orders.push(PaperOrder {
            order_id,
            symbol: symbol.to_string(),
            side,
            quantity,
            order_type,
            status: status.clone(),
        });
        Ok(status)
    }

    fn available_cash(&self) -> Result<f64, LiveError> {
        Ok(self.cash)
    }

    fn commission_rate(&self) -> f64 {
        self.commission
    }

    fn on_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }
}

// ─── Trader ─────────────────────────────────────────────────────────

/// What happened on one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStep {
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    /// Broker response when an order was submitted.
    pub order: Option<OrderStatus>,
}

pub struct LiveTrader<C: ExecutionClient> {
    symbol: String,
    macd: Macd,
    position_size: f64,
    lot_size: f64,
    history: Vec<Bar>,
    crossover: CrossoverState,
    position: PositionState,
    quantity: f64,
    client: C,
}

impl<C: ExecutionClient> LiveTrader<C> {
    pub fn new(symbol: impl Into<String>, params: StrategyParameters, client: C) -> Result<Self, LiveError> {
        params.validate()?;
        Ok(Self {
            symbol: symbol.into(),
            macd: Macd::new(params.fast_period, params.slow_period, params.signal_period)?,
            position_size: params.position_size,
            lot_size: DEFAULT_LOT_SIZE,
            history: Vec::new(),
            crossover: CrossoverState::new(),
            position: PositionState::Flat,
            quantity: 0.0,
            client,
        })
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = lot_size;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn crossover_state(&self) -> CrossoverState {
        self.crossover
    }

    pub fn bars_seen(&self) -> usize {
        self.history.len()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Feed the next closed bar.
    ///
    /// The full close history is kept: EMA seeding depends on the first bars,
    /// so a truncated window would drift from the backtest signals.
    pub fn on_bar(&mut self, bar: &Bar) -> Result<LiveStep, LiveError> {
        if !bar.has_valid_prices() {
            return Err(CoreError::InvalidData(format!("bar at {} has an invalid price", bar.timestamp)).into());
        }
        if let Some(last) = self.history.last() {
            if bar.timestamp <= last.timestamp {
                return Err(LiveError::OutOfOrderBar {
                    last: last.timestamp,
                    got: bar.timestamp,
                });
            }
        }

        self.client.on_price(&self.symbol, bar.close);
        self.history.push(bar.clone());

        let series = self.macd.compute(&closes(&self.history));
        let batch = resume(&series, self.crossover)?;
        self.crossover = batch.state;
        let signal = batch.signals.last().copied().unwrap_or_default();

        let order = match (self.position, signal) {
            (PositionState::Flat, Signal::Buy) => self.enter(bar)?,
            (PositionState::Long, Signal::Sell) => self.exit()?,
            _ => None,
        };

        Ok(LiveStep {
            timestamp: bar.timestamp,
            signal,
            order,
        })
    }

    fn enter(&mut self, bar: &Bar) -> Result<Option<OrderStatus>, LiveError> {
        let cash = self.client.available_cash()?;
        let quantity = floor_to_lot(cash * self.position_size / bar.close, self.lot_size);
        let notional = quantity * bar.close;
        let debit = notional + notional * self.client.commission_rate();
        if quantity <= 0.0 || debit > cash {
            debug!(
                symbol = %self.symbol,
                cash,
                close = bar.close,
                quantity,
                "buy signal skipped: insufficient cash for one lot"
            );
            return Ok(None);
        }

        let status = self
            .client
            .submit_order(&self.symbol, quantity, OrderSide::Buy, OrderType::Market)?;
        match &status {
            OrderStatus::Filled { quantity, price } => {
                info!(symbol = %self.symbol, quantity, price, "entered long");
                self.position = PositionState::Long;
                self.quantity = *quantity;
            }
            OrderStatus::Accepted { order_id } => {
                info!(symbol = %self.symbol, %order_id, quantity, "buy accepted");
                self.position = PositionState::Long;
                self.quantity = quantity;
            }
            OrderStatus::Rejected { reason } => {
                warn!(symbol = %self.symbol, %reason, "buy rejected");
            }
        }
        Ok(Some(status))
    }

    fn exit(&mut self) -> Result<Option<OrderStatus>, LiveError> {
        let status = self
            .client
            .submit_order(&self.symbol, self.quantity, OrderSide::Sell, OrderType::Market)?;
        match &status {
            OrderStatus::Filled { .. } | OrderStatus::Accepted { .. } => {
                info!(symbol = %self.symbol, quantity = self.quantity, "exited long");
                self.position = PositionState::Flat;
                self.quantity = 0.0;
            }
            OrderStatus::Rejected { reason } => {
                warn!(symbol = %self.symbol, %reason, "sell rejected");
            }
        }
        Ok(Some(status))
    }
}
