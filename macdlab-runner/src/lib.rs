//! MACD Lab Runner: backtest orchestration, metrics, optimization and IO.
//!
//! This crate builds on `macdlab-core` to provide:
//! - Single backtests with the full metric report
//! - Grid-search optimization over MACD parameters on a rayon pool
//! - Strategy comparison over fixed parameter sets
//! - Bar providers (Binance) and stores (CSV, in-memory)
//! - JSON/CSV/Markdown artifact export
//! - A live trading adapter over an execution client
//! - TOML configuration and tracing setup

pub mod config;
pub mod data;
pub mod export;
pub mod live;
pub mod logging;
pub mod metrics;
pub mod objective;
pub mod optimizer;
pub mod report;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use data::{load_bars, BarProvider, BarStore, BinanceProvider, CsvBarStore, DataError, MemoryBarStore};
pub use live::{ExecutionClient, LiveError, LiveStep, LiveTrader, OrderStatus, OrderType, PaperExecutionClient};
pub use logging::init_tracing;
pub use metrics::PerformanceMetrics;
pub use objective::Objective;
pub use optimizer::{OptimizationResult, OptimizeError, Optimizer, ParamRange, SearchSpace};
pub use report::{Report, ReportValue};
pub use runner::{
    compare_strategies, default_comparison_set, run_backtest, run_from_config, BacktestResult, RunError,
};
