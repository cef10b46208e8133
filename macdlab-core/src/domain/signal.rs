//! Discrete trading signals and the long-only position state.

use serde::{Deserialize, Serialize};

/// A per-bar trading signal, aligned 1:1 with bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    #[default]
    Hold,
    Sell,
}

impl Signal {
    /// Numeric encoding: Buy = 1, Hold = 0, Sell = -1.
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Hold => 0,
            Self::Sell => -1,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }
}

/// Position state of the long-only simulator. There is no short state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}
