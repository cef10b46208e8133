//! Domain types: bars, signals, orders, trades, equity points and parameters.

pub mod bar;
pub mod equity;
pub mod order;
pub mod params;
pub mod signal;
pub mod trade;

pub use bar::{closes, validate_series, Bar};
pub use equity::EquityPoint;
pub use order::{Order, OrderSide};
pub use params::StrategyParameters;
pub use signal::{PositionState, Signal};
pub use trade::Trade;
