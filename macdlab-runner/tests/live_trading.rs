//! Live adapter fed bar by bar must reproduce the backtest.

use macdlab_core::domain::{PositionState, Signal, StrategyParameters};
use macdlab_core::engine::{run_strategy, SimulationConfig};
use macdlab_core::signals::{MacdStrategy, Strategy};
use macdlab_core::synthetic::sine_wave;
use macdlab_runner::live::{LiveTrader, OrderStatus, PaperExecutionClient};

#[test]
fn incremental_signals_match_batch() {
    let bars = sine_wave(400, 100.0, 10.0, 30.0);
    let params = StrategyParameters::new(3, 6, 2, 0.8);
    let batch = MacdStrategy::new(params).unwrap().generate(&bars).unwrap();

    let mut trader = LiveTrader::new("BTCUSDT", params, PaperExecutionClient::new(10_000.0, 0.002)).unwrap();
    let live: Vec<Signal> = bars.iter().map(|b| trader.on_bar(b).unwrap().signal).collect();

    assert_eq!(live, batch);
    assert_eq!(trader.crossover_state().processed, bars.len());
}

#[test]
fn paper_account_tracks_simulated_cash() {
    let bars = sine_wave(400, 100.0, 10.0, 30.0);
    let params = StrategyParameters::new(3, 6, 2, 0.8);
    let config = SimulationConfig::default();
    let sim = run_strategy(&bars, &MacdStrategy::new(params).unwrap(), &config).unwrap();

    let client = PaperExecutionClient::new(config.initial_cash, config.commission);
    let mut trader = LiveTrader::new("BTCUSDT", params, client).unwrap();
    let mut fills = 0;
    for bar in &bars {
        if let Some(OrderStatus::Filled { .. }) = trader.on_bar(bar).unwrap().order {
            fills += 1;
        }
    }

    let expected_fills = sim.trades.len() * 2 - usize::from(sim.open_trade().is_some());
    assert_eq!(fills, expected_fills);
    assert_eq!(trader.position() == PositionState::Long, sim.open_trade().is_some());

    let client = trader.into_client();
    assert!((client.cash() - sim.final_cash).abs() < 1e-6);
    assert!((client.equity() - sim.final_equity).abs() < 1e-6);
}
