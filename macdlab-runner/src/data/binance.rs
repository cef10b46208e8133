//! Binance spot kline provider.
//!
//! Fetches OHLCV bars from the public `/api/v3/klines` endpoint, paging 1000
//! bars per request. Transient failures (timeouts, 429/418, 5xx) are retried
//! with exponential backoff; everything else maps to a `DataError` at once.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use macdlab_core::domain::Bar;

use super::provider::{interval_duration, validate_symbol, BarProvider, DataError};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Maximum klines per request accepted by the exchange.
pub const PAGE_LIMIT: usize = 1000;

/// Binance error code for an unknown trading pair.
const INVALID_SYMBOL_CODE: i64 = -1121;

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Binance REST kline provider.
pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: StdDuration,
    /// Upper bound on pages per fetch so an unbounded range cannot loop forever.
    max_pages: usize,
}

impl BinanceProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .user_agent(concat!("macdlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: StdDuration::from_millis(500),
            max_pages: 100,
        })
    }

    /// Point the provider at another host (testnet, proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: StdDuration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Last traded price from `/api/v3/ticker/price`.
    pub fn latest_price(&self, symbol: &str) -> Result<f64, DataError> {
        validate_symbol(symbol)?;
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let body = self.get_with_retry(symbol, &url, &[("symbol", symbol.to_string())])?;
        parse_ticker_price(&body)
    }

    /// One GET with retry and status mapping. Returns the response body.
    fn get_with_retry(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            let resp = match self.client.get(url).query(query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(attempt, error = %e, "binance request failed, retrying");
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = resp
                .text()
                .map_err(|e| DataError::NetworkUnreachable(format!("failed to read body: {e}")))?;

            if status.is_success() {
                return Ok(body);
            }

            let error = map_status(symbol, status.as_u16(), retry_after, &body);
            if !error.is_retryable() {
                return Err(error);
            }
            warn!(attempt, status = status.as_u16(), "binance returned a transient error");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }
}

impl BarProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, DataError> {
        validate_symbol(symbol)?;
        let step = interval_duration(interval)?;
        let url = format!("{}/api/v3/klines", self.base_url);

        let mut bars: Vec<Bar> = Vec::new();
        let mut cursor = start;

        for page in 0..self.max_pages {
            let mut query = vec![
                ("symbol", symbol.to_string()),
                ("interval", interval.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(from) = cursor {
                query.push(("startTime", from.timestamp_millis().to_string()));
            }
            if let Some(to) = end {
                query.push(("endTime", to.timestamp_millis().to_string()));
            }

            let body = self.get_with_retry(symbol, &url, &query)?;
            let chunk = parse_klines(&body)?;
            let received = chunk.len();
            debug!(symbol, page, received, "fetched kline page");

            // Without a start bound the exchange returns the latest page only.
            let Some(last) = chunk.last().map(|b| b.timestamp) else {
                break;
            };
            let prev = bars.last().map(|b| b.timestamp);
            bars.extend(
                chunk
                    .into_iter()
                    .filter(|b| prev.map_or(true, |p| b.timestamp > p)),
            );
            if cursor.is_none() || received < PAGE_LIMIT {
                break;
            }
            let next = last + step;
            if end.is_some_and(|to| next > to) {
                break;
            }
            cursor = Some(next);
        }

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

/// Map a non-success response to a `DataError`.
fn map_status(symbol: &str, status: u16, retry_after: Option<u64>, body: &str) -> DataError {
    match status {
        // 418 is the exchange's auto-ban after ignoring 429s.
        429 | 418 => DataError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(60),
        },
        _ => match serde_json::from_str::<ApiError>(body) {
            Ok(err) if err.code == INVALID_SYMBOL_CODE => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Ok(err) => DataError::Http {
                status,
                message: format!("{} ({})", err.msg, err.code),
            },
            Err(_) => DataError::Http {
                status,
                message: body.chars().take(200).collect(),
            },
        },
    }
}

/// Parse a `/api/v3/klines` body: an array of
/// `[open_time_ms, "open", "high", "low", "close", "volume", close_time, ...]`.
pub fn parse_klines(body: &str) -> Result<Vec<Bar>, DataError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("klines are not an array of arrays: {e}")))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() < 6 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "kline {i} has {} fields, expected at least 6",
                    row.len()
                )));
            }
            let open_ms = row[0].as_i64().ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("kline {i} open time is not an integer"))
            })?;
            let timestamp = DateTime::from_timestamp_millis(open_ms).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("kline {i} open time {open_ms} out of range"))
            })?;
            Ok(Bar {
                timestamp,
                open: number(&row[1], i, "open")?,
                high: number(&row[2], i, "high")?,
                low: number(&row[3], i, "low")?,
                close: number(&row[4], i, "close")?,
                volume: number(&row[5], i, "volume")?,
            })
        })
        .collect()
}

/// Prices arrive as decimal strings; accept bare numbers too.
fn number(value: &Value, row: usize, field: &str) -> Result<f64, DataError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataError::ResponseFormatChanged(format!("kline {row} {field} is not numeric: {value}")))
}

/// Parse a `/api/v3/ticker/price` body: `{"symbol": "...", "price": "..."}`.
pub fn parse_ticker_price(body: &str) -> Result<f64, DataError> {
    let ticker: TickerPrice = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("unexpected ticker body: {e}")))?;
    ticker
        .price
        .parse()
        .map_err(|_| DataError::ResponseFormatChanged(format!("ticker price '{}' is not numeric", ticker.price)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
        [1704067200000, "42283.58", "42554.57", "42261.02", "42475.23", "1271.68108", 1704070799999, "53957248.9", 47134, "682.5", "28957113.6", "0"],
        [1704070800000, "42475.23", "42775.00", "42431.65", "42613.56", "1196.37856", 1704074399999, "51000000.0", 44357, "580.1", "24700000.0", "0"]
    ]"#;

    #[test]
    fn parses_kline_rows() {
        let bars = parse_klines(SAMPLE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(bars[0].open, 42283.58);
        assert_eq!(bars[0].close, 42475.23);
        assert_eq!(bars[1].high, 42775.0);
        assert_eq!(bars[1].volume, 1196.37856);
        assert!(bars.iter().all(|b| b.is_sane()));
    }

    #[test]
    fn empty_array_parses_to_no_bars() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_klines_are_format_errors() {
        for body in [
            r#"{"code": -1, "msg": "nope"}"#,
            r#"[[1704067200000, "1.0", "1.0"]]"#,
            r#"[["soon", "1", "1", "1", "1", "1"]]"#,
            r#"[[1704067200000, "abc", "1", "1", "1", "1"]]"#,
        ] {
            assert!(
                matches!(parse_klines(body), Err(DataError::ResponseFormatChanged(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn parses_ticker() {
        let price = parse_ticker_price(r#"{"symbol":"BTCUSDT","price":"42613.56000000"}"#).unwrap();
        assert_eq!(price, 42613.56);
        assert!(parse_ticker_price(r#"{"symbol":"BTCUSDT"}"#).is_err());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            map_status("X", 429, Some(7), ""),
            DataError::RateLimited { retry_after_secs: 7 }
        ));
        assert!(matches!(
            map_status("X", 418, None, ""),
            DataError::RateLimited { retry_after_secs: 60 }
        ));
        assert!(matches!(
            map_status("NOPE", 400, None, r#"{"code":-1121,"msg":"Invalid symbol."}"#),
            DataError::SymbolNotFound { .. }
        ));
        let err = map_status("X", 503, None, "upstream down");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn base_url_is_normalized() {
        let provider = BinanceProvider::new()
            .unwrap()
            .with_base_url("https://testnet.binance.vision/");
        assert_eq!(provider.base_url(), "https://testnet.binance.vision");
        assert_eq!(provider.name(), "binance");
    }

    #[test]
    fn invalid_symbol_rejected_before_network() {
        let provider = BinanceProvider::new().unwrap();
        assert!(matches!(
            provider.fetch_bars("BTC/USDT", "1h", None, None),
            Err(DataError::InvalidSymbol(_))
        ));
        assert!(matches!(
            provider.fetch_bars("BTCUSDT", "7q", None, None),
            Err(DataError::InvalidInterval(_))
        ));
    }
}
