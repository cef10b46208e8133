//! Error types shared by the indicator, signal and simulation stages.

use thiserror::Error;

/// Errors raised by the core pipeline.
///
/// Configuration problems (`InvalidParameter`) and data problems
/// (`InsufficientData`, `InvalidData`) are both detected before the first bar
/// is processed, so a failed run never yields a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl CoreError {
    /// True for the data-error class (too few bars, bad prices, bad timestamps).
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::InvalidData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_classification() {
        assert!(CoreError::InsufficientData {
            required: 36,
            actual: 10
        }
        .is_data_error());
        assert!(CoreError::InvalidData("non-positive close".into()).is_data_error());
        assert!(!CoreError::InvalidParameter("fast >= slow".into()).is_data_error());
    }

    #[test]
    fn display_mentions_counts() {
        let err = CoreError::InsufficientData {
            required: 36,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 36 bars, got 10"
        );
    }
}
