//! Flat, stably-ordered performance report.
//!
//! Keys are fixed strings such as `"Return [%]"` or `"Max. Drawdown Duration"`.
//! A `Report` renders to the console (`Display`), and serializes to a JSON
//! object preserving key order. CSV rendering lives in `export`.

use chrono::{DateTime, Duration, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

pub const START: &str = "Start";
pub const END: &str = "End";
pub const DURATION: &str = "Duration";
pub const EXPOSURE_TIME: &str = "Exposure Time [%]";
pub const EQUITY_FINAL: &str = "Equity Final [$]";
pub const EQUITY_PEAK: &str = "Equity Peak [$]";
pub const RETURN: &str = "Return [%]";
pub const BUY_HOLD_RETURN: &str = "Buy & Hold Return [%]";
pub const RETURN_ANN: &str = "Return (Ann.) [%]";
pub const VOLATILITY_ANN: &str = "Volatility (Ann.) [%]";
pub const SHARPE: &str = "Sharpe Ratio";
pub const SORTINO: &str = "Sortino Ratio";
pub const CALMAR: &str = "Calmar Ratio";
pub const MAX_DRAWDOWN: &str = "Max. Drawdown [%]";
pub const AVG_DRAWDOWN: &str = "Avg. Drawdown [%]";
pub const MAX_DRAWDOWN_DURATION: &str = "Max. Drawdown Duration";
pub const AVG_DRAWDOWN_DURATION: &str = "Avg. Drawdown Duration";
pub const TRADES: &str = "# Trades";
pub const WIN_RATE: &str = "Win Rate [%]";
pub const BEST_TRADE: &str = "Best Trade [%]";
pub const WORST_TRADE: &str = "Worst Trade [%]";
pub const AVG_TRADE: &str = "Avg. Trade [%]";
pub const MAX_TRADE_DURATION: &str = "Max. Trade Duration";
pub const AVG_TRADE_DURATION: &str = "Avg. Trade Duration";
pub const PROFIT_FACTOR: &str = "Profit Factor";
pub const EXPECTANCY: &str = "Expectancy [%]";
pub const SQN: &str = "SQN";

/// Report keys in their fixed output order.
pub const KEYS: [&str; 27] = [
    START,
    END,
    DURATION,
    EXPOSURE_TIME,
    EQUITY_FINAL,
    EQUITY_PEAK,
    RETURN,
    BUY_HOLD_RETURN,
    RETURN_ANN,
    VOLATILITY_ANN,
    SHARPE,
    SORTINO,
    CALMAR,
    MAX_DRAWDOWN,
    AVG_DRAWDOWN,
    MAX_DRAWDOWN_DURATION,
    AVG_DRAWDOWN_DURATION,
    TRADES,
    WIN_RATE,
    BEST_TRADE,
    WORST_TRADE,
    AVG_TRADE,
    MAX_TRADE_DURATION,
    AVG_TRADE_DURATION,
    PROFIT_FACTOR,
    EXPECTANCY,
    SQN,
];

/// A single report cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportValue {
    Timestamp(DateTime<Utc>),
    Duration(Duration),
    Number(f64),
    Count(usize),
    /// Metric has no meaningful value (e.g. profit factor with no losing trades).
    Undefined,
}

impl ReportValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Count(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::Number)
    }

    pub fn from_secs(secs: Option<i64>) -> Self {
        secs.map_or(Self::Undefined, |s| Self::Duration(Duration::seconds(s)))
    }
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Self::Duration(d) => write!(f, "{}", format_duration(*d)),
            Self::Number(v) => write!(f, "{v:.4}"),
            Self::Count(n) => write!(f, "{n}"),
            Self::Undefined => f.write_str("Undefined"),
        }
    }
}

/// `"3 days 04:05:06"` style duration.
pub fn format_duration(d: Duration) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let days = total / 86_400;
    let rem = total % 86_400;
    format!(
        "{sign}{days} days {:02}:{:02}:{:02}",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Ordered (key, value) list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    entries: Vec<(&'static str, ReportValue)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &'static str, value: ReportValue) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<ReportValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Numeric view of a metric; `None` for missing keys and non-numeric cells.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, ReportValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.keys().map(str::len).max().unwrap_or(0);
        for (key, value) in &self.entries {
            writeln!(f, "{key:<width$}  {value}")?;
        }
        Ok(())
    }
}

impl Serialize for ReportValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            Self::Duration(d) => serializer.serialize_str(&format_duration(*d)),
            Self::Number(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Number(_) | Self::Undefined => serializer.serialize_none(),
            Self::Count(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
