//! MACD Lab Core: domain types, indicators, signals and the trade simulator.
//!
//! Data flows strictly one way:
//! bars → MACD indicator → crossover signals → simulated trades/equity.
//!
//! Everything here is synchronous and deterministic. Orchestration, metrics,
//! optimization and IO live in `macdlab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod signals;
pub mod synthetic;

pub use error::CoreError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared with optimizer worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();
        require_send::<domain::StrategyParameters>();
        require_sync::<domain::StrategyParameters>();

        require_send::<indicators::MacdSeries>();
        require_sync::<indicators::MacdSeries>();
        require_send::<signals::CrossoverState>();
        require_sync::<signals::CrossoverState>();
        require_send::<signals::MacdStrategy>();
        require_sync::<signals::MacdStrategy>();

        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        require_send::<fingerprint::RunId>();
        require_sync::<fingerprint::RunId>();
        require_send::<CoreError>();
        require_sync::<CoreError>();
    }

    #[test]
    fn strategy_is_object_safe() {
        let strategy = signals::MacdStrategy::new(domain::StrategyParameters::default()).unwrap();
        let boxed: Box<dyn signals::Strategy> = Box::new(strategy);
        assert_eq!(boxed.name(), "macd_12_26_9");
    }
}
