//! End-to-end simulator runs through the `Strategy` interface.

use chrono::Duration;
use macdlab_core::domain::{OrderSide, Signal, StrategyParameters};
use macdlab_core::engine::{run_simulation, run_strategy, SimulationConfig};
use macdlab_core::signals::MacdStrategy;
use macdlab_core::synthetic::{bars_from_closes, default_start, random_walk, sine_wave};
use macdlab_core::CoreError;

#[test]
fn hand_computed_round_trip() {
    let bars = bars_from_closes(&[100.0, 100.0, 110.0], default_start(), Duration::hours(1));
    let config = SimulationConfig::new(10_000.0, 0.002).with_lot_size(1.0);
    let result = run_simulation(&bars, &[Signal::Hold, Signal::Buy, Signal::Sell], 0.8, &config).unwrap();

    let trade = &result.trades[0];
    assert_eq!(trade.entry.side, OrderSide::Buy);
    assert_eq!(trade.entry.quantity, 80.0);
    assert!((trade.entry.commission - 16.0).abs() < 1e-9);
    let exit = trade.exit.as_ref().unwrap();
    assert!((exit.cash_flow() - 8782.4).abs() < 1e-9);
    assert!((trade.cost() - 8016.0).abs() < 1e-9);
    assert!((trade.pnl.unwrap() - 766.4).abs() < 1e-9);
    assert!((result.final_cash - 10_766.4).abs() < 1e-9);
}

#[test]
fn rising_series_holds_one_open_trade() {
    let closes: Vec<f64> = (0..100)
        .map(|i| {
            if i < 50 {
                100.0 + 20.0 * (i as f64).sqrt()
            } else {
                let k = (i - 50) as f64;
                100.0 + 20.0 * 50f64.sqrt() + 0.5 * k + 0.05 * k * k
            }
        })
        .collect();
    let bars = bars_from_closes(&closes, default_start(), Duration::hours(1));
    let config = SimulationConfig::default();
    let strategy = MacdStrategy::new(StrategyParameters::default()).unwrap();
    let result = run_strategy(&bars, &strategy, &config).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert!(result.trades[0].is_open);
    assert_eq!(result.trades[0].entry.bar_index, 68);
    let entry_commission = result.trades[0].entry.commission;
    assert!(result.final_equity > config.initial_cash - entry_commission);
}

#[test]
fn insufficient_bars_fail_before_simulation() {
    let bars = random_walk(35, 100.0, 3);
    let strategy = MacdStrategy::new(StrategyParameters::default()).unwrap();
    let err = run_strategy(&bars, &strategy, &SimulationConfig::default()).unwrap_err();
    assert_eq!(err, CoreError::InsufficientData { required: 36, actual: 35 });
}

#[test]
fn bad_prices_are_rejected() {
    let mut bars = random_walk(60, 100.0, 3);
    bars[40].close = f64::NAN;
    let strategy = MacdStrategy::new(StrategyParameters::new(3, 6, 2, 0.5)).unwrap();
    let err = run_strategy(&bars, &strategy, &SimulationConfig::default()).unwrap_err();
    assert!(err.is_data_error());
}

#[test]
fn unordered_timestamps_are_rejected() {
    let mut bars = random_walk(60, 100.0, 3);
    bars.swap(10, 11);
    let strategy = MacdStrategy::new(StrategyParameters::new(3, 6, 2, 0.5)).unwrap();
    let err = run_strategy(&bars, &strategy, &SimulationConfig::default()).unwrap_err();
    assert!(matches!(err, CoreError::InvalidData(_)));
}

#[test]
fn bad_config_is_rejected_first() {
    let bars = random_walk(5, 100.0, 3);
    let strategy = MacdStrategy::new(StrategyParameters::default()).unwrap();
    let err = run_strategy(&bars, &strategy, &SimulationConfig::new(100.0, 1.5)).unwrap_err();
    assert!(matches!(err, CoreError::InvalidParameter(_)));
}

#[test]
fn oscillation_produces_closed_trades() {
    let bars = sine_wave(400, 100.0, 10.0, 30.0);
    let strategy = MacdStrategy::new(StrategyParameters::new(3, 6, 2, 0.8)).unwrap();
    let result = run_strategy(&bars, &strategy, &SimulationConfig::default()).unwrap();

    assert!(result.closed_trades().count() >= 5);
    for trade in result.closed_trades() {
        let exit = trade.exit.as_ref().unwrap();
        assert!(exit.bar_index > trade.entry.bar_index);
        assert_eq!(exit.quantity, trade.entry.quantity);
    }
    for w in result.trades.windows(2) {
        let prev_exit = w[0].exit.as_ref().unwrap();
        assert!(w[1].entry.bar_index > prev_exit.bar_index);
    }
}

#[test]
fn runs_are_deterministic() {
    let bars = random_walk(500, 100.0, 99);
    let strategy = MacdStrategy::new(StrategyParameters::new(8, 21, 5, 0.6)).unwrap();
    let config = SimulationConfig::default();
    assert_eq!(
        run_strategy(&bars, &strategy, &config).unwrap(),
        run_strategy(&bars, &strategy, &config).unwrap()
    );
}
