//! Backtest runner: wires indicators, signals, simulator and metrics together.
//!
//! Entry points:
//! - `run_backtest()`: one parameter set over pre-loaded bars.
//! - `evaluate()`: metrics only, for optimizer inner loops.
//! - `compare_strategies()`: several fixed parameter sets over the same bars.
//! - `run_from_config()`: loads bars through a store/provider, then runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use macdlab_core::domain::{Bar, EquityPoint, StrategyParameters, Trade};
use macdlab_core::engine::{run_strategy, SimulationConfig};
use macdlab_core::fingerprint::{DatasetHash, ParamsHash, RunId};
use macdlab_core::signals::{MacdStrategy, Strategy};
use macdlab_core::CoreError;

use crate::config::{BacktestConfig, ConfigError};
use crate::data::{load_bars, BarProvider, BarStore, DataError};
use crate::metrics::{annualization_factor, PerformanceMetrics};
use crate::report::{self, Report, ReportValue};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub params: StrategyParameters,
    pub config: SimulationConfig,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub dataset_hash: DatasetHash,
    pub run_id: RunId,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub signal_count: usize,
    pub skipped_entries: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Flat report with the exact metric names, in fixed order.
    pub fn report(&self) -> Report {
        build_report(&self.metrics)
    }
}

/// Build the report rows for a metrics set.
pub fn build_report(m: &PerformanceMetrics) -> Report {
    use ReportValue::{Count, Number};

    let ts = |t: Option<DateTime<Utc>>| t.map_or(ReportValue::Undefined, ReportValue::Timestamp);
    let mut r = Report::new();
    r.push(report::START, ts(m.start));
    r.push(report::END, ts(m.end));
    r.push(report::DURATION, ReportValue::from_secs(Some(m.duration_secs)));
    r.push(report::EXPOSURE_TIME, Number(m.exposure_time_pct));
    r.push(report::EQUITY_FINAL, Number(m.equity_final));
    r.push(report::EQUITY_PEAK, Number(m.equity_peak));
    r.push(report::RETURN, Number(m.return_pct));
    r.push(report::BUY_HOLD_RETURN, ReportValue::from_option(m.buy_hold_return_pct));
    r.push(report::RETURN_ANN, Number(m.return_ann_pct));
    r.push(report::VOLATILITY_ANN, Number(m.volatility_ann_pct));
    r.push(report::SHARPE, Number(m.sharpe));
    r.push(report::SORTINO, Number(m.sortino));
    r.push(report::CALMAR, Number(m.calmar));
    r.push(report::MAX_DRAWDOWN, Number(m.max_drawdown_pct));
    r.push(report::AVG_DRAWDOWN, Number(m.avg_drawdown_pct));
    r.push(report::MAX_DRAWDOWN_DURATION, ReportValue::from_secs(m.max_drawdown_duration_secs));
    r.push(report::AVG_DRAWDOWN_DURATION, ReportValue::from_secs(m.avg_drawdown_duration_secs));
    r.push(report::TRADES, Count(m.trade_count));
    r.push(report::WIN_RATE, Number(m.win_rate_pct));
    r.push(report::BEST_TRADE, ReportValue::from_option(m.best_trade_pct));
    r.push(report::WORST_TRADE, ReportValue::from_option(m.worst_trade_pct));
    r.push(report::AVG_TRADE, ReportValue::from_option(m.avg_trade_pct));
    r.push(report::MAX_TRADE_DURATION, ReportValue::from_secs(m.max_trade_duration_secs));
    r.push(report::AVG_TRADE_DURATION, ReportValue::from_secs(m.avg_trade_duration_secs));
    r.push(report::PROFIT_FACTOR, ReportValue::from_option(m.profit_factor));
    r.push(report::EXPECTANCY, ReportValue::from_option(m.expectancy_pct));
    r.push(report::SQN, Number(m.sqn));
    r
}

/// Run one backtest over pre-loaded bars. No I/O.
pub fn run_backtest(
    bars: &[Bar],
    params: &StrategyParameters,
    config: &SimulationConfig,
) -> Result<BacktestResult, RunError> {
    let _span = tracing::info_span!("backtest", params = %params, bars = bars.len()).entered();

    let strategy = MacdStrategy::new(*params)?;
    let run = run_strategy(bars, &strategy, config)?;

    let timestamps: Vec<DateTime<Utc>> = bars.iter().map(|b| b.timestamp).collect();
    let metrics = PerformanceMetrics::compute(
        &run.equity_curve,
        &run.trades,
        config.initial_cash,
        annualization_factor(&timestamps),
    )
    .with_benchmark(bars);

    let dataset_hash = DatasetHash::of_bars(bars);
    let run_id = RunId::new(&dataset_hash, &ParamsHash::of(params, config));
    info!(
        run_id = run_id.short(),
        return_pct = metrics.return_pct,
        trades = metrics.trade_count,
        "backtest complete"
    );

    // run_strategy rejects empty input, so both ends exist.
    let start = timestamps.first().copied().unwrap_or_default();
    let end = timestamps.last().copied().unwrap_or_default();

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        start,
        end,
        params: *params,
        config: config.clone(),
        metrics,
        bar_count: run.bar_count(),
        warmup_bars: strategy.warmup_bars(),
        signal_count: run.signal_count,
        skipped_entries: run.skipped_entries,
        trades: run.trades,
        equity_curve: run.equity_curve,
        dataset_hash,
        run_id,
    })
}

/// Metrics-only evaluation with a precomputed annualization factor.
pub fn evaluate(
    bars: &[Bar],
    params: &StrategyParameters,
    config: &SimulationConfig,
    annualization_factor: f64,
) -> Result<PerformanceMetrics, RunError> {
    let strategy = MacdStrategy::new(*params)?;
    let run = run_strategy(bars, &strategy, config)?;
    Ok(PerformanceMetrics::compute(
        &run.equity_curve,
        &run.trades,
        config.initial_cash,
        annualization_factor,
    )
    .with_benchmark(bars))
}

/// The fixed comparison set: classic, faster and slower MACD variants.
pub fn default_comparison_set() -> Vec<StrategyParameters> {
    vec![
        StrategyParameters::new(12, 26, 9, 0.8),
        StrategyParameters::new(8, 21, 5, 0.6),
        StrategyParameters::new(15, 30, 12, 1.0),
    ]
}

/// Run several parameter sets over the same bars. Results align with `params`.
pub fn compare_strategies(
    bars: &[Bar],
    params: &[StrategyParameters],
    config: &SimulationConfig,
) -> Vec<Result<BacktestResult, RunError>> {
    let _span = tracing::info_span!("compare", strategies = params.len()).entered();
    params
        .iter()
        .map(|p| {
            let result = run_backtest(bars, p, config);
            if let Err(e) = &result {
                tracing::warn!(params = %p, error = %e, "comparison run failed");
            }
            result
        })
        .collect()
}

/// Load bars for the configured symbol and run the configured strategy.
pub fn run_from_config(
    config: &BacktestConfig,
    store: &dyn BarStore,
    provider: Option<&dyn BarProvider>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let bars = load_bars(
        store,
        provider,
        &config.backtest.symbol,
        &config.backtest.interval,
        config.data.start,
        config.data.end,
    )?;
    run_backtest(&bars, &config.strategy_params(), &config.simulation_config())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macdlab_core::synthetic::{random_walk, sine_wave};

    #[test]
    fn report_has_every_key_in_order() {
        let bars = sine_wave(300, 100.0, 10.0, 30.0);
        let result = run_backtest(&bars, &StrategyParameters::new(3, 6, 2, 0.8), &SimulationConfig::default()).unwrap();
        let keys: Vec<&str> = result.report().keys().collect();
        assert_eq!(keys, report::KEYS.to_vec());
    }

    #[test]
    fn result_carries_fingerprint() {
        let bars = random_walk(200, 100.0, 5);
        let params = StrategyParameters::default();
        let config = SimulationConfig::default();
        let a = run_backtest(&bars, &params, &config).unwrap();
        let b = run_backtest(&bars, &params, &config).unwrap();
        assert_eq!(a.run_id, b.run_id);
        assert_eq!(a.run_id, RunId::compute(&bars, &params, &config));
        assert_eq!(a.bar_count, 200);
        assert_eq!(a.warmup_bars, 34);
        assert_eq!(a.start, bars[0].timestamp);
        assert_eq!(a.end, bars[199].timestamp);
        assert!(a.metrics.buy_hold_return_pct.is_some());
    }

    #[test]
    fn evaluate_matches_run_backtest_metrics() {
        let bars = random_walk(300, 100.0, 11);
        let params = StrategyParameters::new(5, 13, 4, 0.7);
        let config = SimulationConfig::default();
        let ts: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        let full = run_backtest(&bars, &params, &config).unwrap();
        let quick = evaluate(&bars, &params, &config, annualization_factor(&ts)).unwrap();
        assert_eq!(full.metrics, quick);
    }

    #[test]
    fn invalid_params_fail_fast() {
        let bars = random_walk(200, 100.0, 5);
        let err = run_backtest(&bars, &StrategyParameters::new(26, 12, 9, 0.8), &SimulationConfig::default())
            .unwrap_err();
        assert!(matches!(err, RunError::Core(CoreError::InvalidParameter(_))));
    }

    #[test]
    fn comparison_keeps_input_order_and_isolates_failures() {
        let bars = random_walk(300, 100.0, 8);
        let mut params = default_comparison_set();
        params.push(StrategyParameters::new(30, 10, 9, 0.5));
        let results = compare_strategies(&bars, &params, &SimulationConfig::default());
        assert_eq!(results.len(), 4);
        for (p, r) in params.iter().zip(&results).take(3) {
            assert_eq!(&r.as_ref().unwrap().params, p);
        }
        assert!(results[3].is_err());
    }
}
