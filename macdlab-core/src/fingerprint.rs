//! Run fingerprinting: deterministic identification of a backtest.
//!
//! - `DatasetHash`: content hash of a bar series.
//! - `ParamsHash`: hash of strategy parameters plus simulation config.
//! - `RunId`: dataset hash + params hash, so identical inputs map to the same id.

use crate::domain::{Bar, StrategyParameters};
use crate::engine::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! hash_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// First 12 hex characters, for display.
            pub fn short(&self) -> &str {
                &self.0[..self.0.len().min(12)]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

hash_id!(DatasetHash, "BLAKE3 content hash of a bar series.");
hash_id!(ParamsHash, "BLAKE3 hash of strategy parameters and simulation config.");
hash_id!(RunId, "Deterministic run identity (dataset + parameters).");

impl DatasetHash {
    pub fn of_bars(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(bars.len() as u64).to_le_bytes());
        for bar in bars {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl ParamsHash {
    pub fn of(params: &StrategyParameters, config: &SimulationConfig) -> Self {
        let mut hasher = blake3::Hasher::new();
        for p in [params.fast_period, params.slow_period, params.signal_period] {
            hasher.update(&(p as u64).to_le_bytes());
        }
        for v in [
            params.position_size,
            config.initial_cash,
            config.commission,
            config.lot_size,
        ] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.update(&[u8::from(config.exclusive_orders)]);
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl RunId {
    pub fn new(dataset: &DatasetHash, params: &ParamsHash) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(dataset.0.as_bytes());
        hasher.update(b"+");
        hasher.update(params.0.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn compute(bars: &[Bar], params: &StrategyParameters, config: &SimulationConfig) -> Self {
        Self::new(&DatasetHash::of_bars(bars), &ParamsHash::of(params, config))
    }
}
