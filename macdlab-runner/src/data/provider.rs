//! Bar provider trait, interval parsing and structured data errors.
//!
//! Providers fetch bars from a remote source; stores persist them. The
//! loader in `data::load_bars` sits above both, so providers never touch
//! storage.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use macdlab_core::domain::Bar;

/// Structured errors for fetching, parsing and storing bars.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid interval '{0}' (expected e.g. 1m, 15m, 1h, 4h, 1d, 1w)")]
    InvalidInterval(String),

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("no bars for '{symbol}' in the requested range")]
    NoData { symbol: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store error: {0}")]
    Store(String),
}

impl DataError {
    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnreachable(_) | Self::RateLimited { .. }
        ) || matches!(self, Self::Http { status, .. } if *status >= 500)
    }
}

/// A remote source of OHLCV bars.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for `symbol` at `interval`, oldest first.
    ///
    /// `start`/`end` bound the open time inclusively; `None` means the
    /// provider's own default range.
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Parse an interval like `"15m"`, `"1h"`, `"1d"` or `"1w"` into its length.
pub fn interval_duration(interval: &str) -> Result<Duration, DataError> {
    let invalid = || DataError::InvalidInterval(interval.to_string());
    let interval = interval.trim();
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().map_err(|_| invalid())?;
    if count <= 0 {
        return Err(invalid());
    }
    let duration = match unit {
        "s" => Duration::seconds(count),
        "m" => Duration::minutes(count),
        "h" => Duration::hours(count),
        "d" => Duration::days(count),
        "w" => Duration::weeks(count),
        _ => return Err(invalid()),
    };
    Ok(duration)
}

/// Symbols are uppercase alphanumerics (plus `-`, `_`, `.`), e.g. `BTCUSDT`.
pub fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    let ok = !symbol.is_empty()
        && symbol.len() <= 32
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(DataError::InvalidSymbol(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_intervals() {
        assert_eq!(interval_duration("1m").unwrap(), Duration::minutes(1));
        assert_eq!(interval_duration("15m").unwrap(), Duration::minutes(15));
        assert_eq!(interval_duration("1h").unwrap(), Duration::hours(1));
        assert_eq!(interval_duration("4h").unwrap(), Duration::hours(4));
        assert_eq!(interval_duration("1d").unwrap(), Duration::days(1));
        assert_eq!(interval_duration("1w").unwrap(), Duration::weeks(1));
    }

    #[test]
    fn rejects_bad_intervals() {
        for bad in ["", "h", "0h", "1q", "1.5h", "-1h"] {
            assert!(
                matches!(interval_duration(bad), Err(DataError::InvalidInterval(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn symbol_validation() {
        assert!(validate_symbol("BTCUSDT").is_ok());
        assert!(validate_symbol("BRK.B").is_ok());
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("../etc/passwd").is_err());
        assert!(validate_symbol("BTC USDT").is_err());
    }

    #[test]
    fn retryable_classification() {
        assert!(DataError::NetworkUnreachable("timeout".into()).is_retryable());
        assert!(DataError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(DataError::Http { status: 502, message: String::new() }.is_retryable());
        assert!(!DataError::Http { status: 400, message: String::new() }.is_retryable());
        assert!(!DataError::SymbolNotFound { symbol: "X".into() }.is_retryable());
    }
}
