//! Simulation engine: turns bars and signals into trades and an equity curve.

pub mod config;
pub mod simulator;
pub mod state;

pub use config::{SimulationConfig, DEFAULT_LOT_SIZE};
pub use simulator::{floor_to_lot, run_simulation, run_strategy};
pub use state::{RunResult, RunState};
