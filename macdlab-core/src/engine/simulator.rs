//! Bar-by-bar long-only trade simulation.
//!
//! Two states, Flat and Long. All fills happen at the bar close:
//! - Flat + Buy: size the entry from available cash, buy if affordable
//! - Long + Sell: sell the whole position
//! - anything else: no-op
//!
//! An equity point is recorded after every bar. A position still open at the
//! last bar stays open and is marked to market.

use super::config::SimulationConfig;
use super::state::{RunResult, RunState};
use crate::domain::{validate_series, Bar, Order, OrderSide, PositionState, Signal, Trade};
use crate::error::CoreError;
use crate::signals::Strategy;
use tracing::debug;

/// Floor `raw` to a whole number of lots. The result never exceeds `raw`.
///
/// Rounding first keeps exact multiples (e.g. 80 / 1e-8) from landing one
/// lot short; any lot that overshoots `raw` is then dropped.
pub fn floor_to_lot(raw: f64, lot_size: f64) -> f64 {
    if !(raw.is_finite() && raw > 0.0) {
        return 0.0;
    }
    let mut units = (raw / lot_size).round();
    while units > 0.0 && units * lot_size > raw {
        units -= 1.0;
    }
    units * lot_size
}

/// Simulate pre-computed signals over a bar series.
///
/// Validation happens before the first bar: configuration, then data.
pub fn run_simulation(
    bars: &[Bar],
    signals: &[Signal],
    position_size: f64,
    config: &SimulationConfig,
) -> Result<RunResult, CoreError> {
    config.validate_with_size(position_size)?;
    if bars.is_empty() {
        return Err(CoreError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    validate_series(bars)?;
    if signals.len() != bars.len() {
        return Err(CoreError::InvalidData(format!(
            "signal count {} does not match bar count {}",
            signals.len(),
            bars.len()
        )));
    }

    let mut state = RunState::new(config.initial_cash, bars.len());
    for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        if !signal.is_hold() {
            state.signal_count += 1;
        }
        match (state.position, signal) {
            (PositionState::Flat, Signal::Buy) => enter(&mut state, bar, i, position_size, config),
            (PositionState::Long, Signal::Sell) => exit(&mut state, bar, i, config),
            _ => {}
        }
        state.mark(bar.timestamp, bar.close);
    }

    Ok(state.into_result(config.initial_cash))
}

/// Validate bars, generate the strategy's signals and simulate them.
pub fn run_strategy(
    bars: &[Bar],
    strategy: &dyn Strategy,
    config: &SimulationConfig,
) -> Result<RunResult, CoreError> {
    config.validate_with_size(strategy.position_size())?;
    let required = strategy.min_bars();
    if bars.len() < required {
        return Err(CoreError::InsufficientData {
            required,
            actual: bars.len(),
        });
    }
    validate_series(bars)?;

    let signals = strategy.generate(bars)?;
    run_simulation(bars, &signals, strategy.position_size(), config)
}

fn enter(state: &mut RunState, bar: &Bar, i: usize, position_size: f64, config: &SimulationConfig) {
    let quantity = floor_to_lot(state.cash * position_size / bar.close, config.lot_size);
    let notional = quantity * bar.close;
    let commission = notional * config.commission;
    let debit = notional + commission;

    if quantity <= 0.0 || debit > state.cash {
        state.skipped_entries += 1;
        debug!(
            bar = i,
            cash = state.cash,
            close = bar.close,
            quantity,
            "buy signal skipped: insufficient cash for one lot"
        );
        return;
    }

    state.cash -= debit;
    state.quantity = quantity;
    state.position = PositionState::Long;
    let order = Order {
        side: OrderSide::Buy,
        quantity,
        price: bar.close,
        timestamp: bar.timestamp,
        bar_index: i,
        commission,
    };
    debug!(bar = i, quantity, price = bar.close, commission, "buy filled");
    state.open_trade = Some(Trade::open(order));
}

fn exit(state: &mut RunState, bar: &Bar, i: usize, config: &SimulationConfig) {
    let quantity = state.quantity;
    let notional = quantity * bar.close;
    let commission = notional * config.commission;
    let order = Order {
        side: OrderSide::Sell,
        quantity,
        price: bar.close,
        timestamp: bar.timestamp,
        bar_index: i,
        commission,
    };

    state.cash += order.cash_flow();
    state.quantity = 0.0;
    state.position = PositionState::Flat;
    if let Some(mut trade) = state.open_trade.take() {
        trade.close(order);
        debug!(bar = i, price = bar.close, pnl = trade.pnl, "sell filled");
        state.closed_trades.push(trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: t0 + Duration::hours(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn floor_to_lot_is_exact_on_multiples() {
        assert_eq!(floor_to_lot(80.0, 1e-8), 80.0);
        assert_eq!(floor_to_lot(80.7, 1.0), 80.0);
        assert_eq!(floor_to_lot(0.4, 1.0), 0.0);
        assert_eq!(floor_to_lot(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn floor_to_lot_never_rounds_up() {
        let raw = 10_000.0 / 1.0001;
        let q = floor_to_lot(raw, 1e-8);
        assert!(q <= raw);
        assert!(raw - q < 1e-8);
    }

    #[test]
    fn full_size_without_commission_fills() {
        let config = SimulationConfig::new(10_000.0, 0.0);
        let bars = bars(&[1.0001, 1.0001]);
        let result = run_simulation(&bars, &[Signal::Buy, Signal::Hold], 1.0, &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.skipped_entries, 0);
        assert!(result.final_cash >= 0.0);
    }

    #[test]
    fn buy_then_sell_realizes_pnl() {
        let config = SimulationConfig::new(10_000.0, 0.002).with_lot_size(1.0);
        let bars = bars(&[100.0, 100.0, 110.0, 110.0]);
        let signals = [Signal::Hold, Signal::Buy, Signal::Sell, Signal::Hold];
        let result = run_simulation(&bars, &signals, 0.8, &config).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.quantity(), 80.0);
        assert!((trade.pnl.unwrap() - 766.4).abs() < 1e-9);
        assert!((result.final_equity - 10_766.4).abs() < 1e-9);
        assert!((result.equity_curve[1].cash - 1984.0).abs() < 1e-9);
    }

    #[test]
    fn sell_while_flat_and_buy_while_long_are_noops() {
        let config = SimulationConfig::new(1000.0, 0.0).with_lot_size(1.0);
        let bars = bars(&[10.0, 10.0, 10.0, 10.0]);
        let signals = [Signal::Sell, Signal::Buy, Signal::Buy, Signal::Hold];
        let result = run_simulation(&bars, &signals, 0.5, &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert!(result.trades[0].is_open);
        assert_eq!(result.trades[0].quantity(), 50.0);
        assert_eq!(result.signal_count, 3);
    }

    #[test]
    fn full_size_with_commission_skips_entry() {
        let config = SimulationConfig::new(1000.0, 0.01).with_lot_size(1.0);
        let bars = bars(&[10.0, 10.0]);
        let result = run_simulation(&bars, &[Signal::Buy, Signal::Hold], 1.0, &config).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.skipped_entries, 1);
        assert_eq!(result.final_equity, 1000.0);
    }

    #[test]
    fn open_trade_at_end_is_marked_not_closed() {
        let config = SimulationConfig::new(1000.0, 0.0).with_lot_size(1.0);
        let bars = bars(&[10.0, 12.0]);
        let result = run_simulation(&bars, &[Signal::Buy, Signal::Hold], 1.0, &config).unwrap();
        let open = result.open_trade().unwrap();
        assert!(open.exit.is_none());
        assert_eq!(result.closed_trades().count(), 0);
        assert_eq!(result.final_equity, 1200.0);
    }

    #[test]
    fn rejects_mismatched_signals() {
        let config = SimulationConfig::default();
        let err = run_simulation(&bars(&[1.0, 2.0]), &[Signal::Hold], 0.5, &config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidData(_)));
    }

    #[test]
    fn config_errors_win_over_data_errors() {
        let config = SimulationConfig::new(0.0, 0.0);
        let err = run_simulation(&[], &[], 0.5, &config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter(_)));
    }
}
