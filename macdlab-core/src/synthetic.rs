//! Synthetic bar series for demos, tests and benches.

use crate::domain::Bar;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default origin of synthetic series: 2024-01-01 00:00 UTC.
pub fn default_start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// Build bars from closes at a fixed interval.
///
/// open = previous close, high/low = max/min(open, close) ± 0.1%.
pub fn bars_from_closes(closes: &[f64], start: DateTime<Utc>, interval: Duration) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + interval * i as i32,
                open,
                high: open.max(close) * 1.001,
                low: open.min(close) * 0.999,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// Hourly seeded random walk with multiplicative steps of up to ±2%.
pub fn random_walk(n: usize, start_price: f64, seed: u64) -> Vec<Bar> {
    random_walk_with(n, start_price, 0.0, 0.02, seed)
}

/// Seeded random walk with a per-bar drift and a uniform shock in
/// `[-volatility, volatility]`, both as fractions of price.
pub fn random_walk_with(
    n: usize,
    start_price: f64,
    drift: f64,
    volatility: f64,
    seed: u64,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = start_price;
    let mut closes = Vec::with_capacity(n);
    for _ in 0..n {
        closes.push(price);
        let shock = if volatility > 0.0 {
            rng.gen_range(-volatility..volatility)
        } else {
            0.0
        };
        price = (price * (1.0 + drift + shock)).max(0.01);
    }
    bars_from_closes(&closes, default_start(), Duration::hours(1))
}

/// Deterministic oscillation: `mid ± amplitude` as a sine of the given period.
pub fn sine_wave(n: usize, mid: f64, amplitude: f64, period: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| mid + amplitude * (std::f64::consts::TAU * i as f64 / period).sin())
        .collect();
    bars_from_closes(&closes, default_start(), Duration::hours(1))
}
