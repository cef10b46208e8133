//! MACD oscillator: fast EMA minus slow EMA, its signal line and histogram.
//!
//! Lookback: max(fast, slow) + signal - 1. Entries before it are NaN in all
//! three lines.

use super::ema::ema_of_series;
use crate::domain::params::validate_periods;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Validated MACD period triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

/// One bar's worth of MACD output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSample {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl IndicatorSample {
    pub fn is_defined(&self) -> bool {
        !(self.macd.is_nan() || self.signal.is_nan())
    }
}

/// Full MACD output, aligned 1:1 with the input closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, CoreError> {
        validate_periods(fast, slow, signal)?;
        Ok(Self { fast, slow, signal })
    }

    pub fn fast(&self) -> usize {
        self.fast
    }

    pub fn slow(&self) -> usize {
        self.slow
    }

    pub fn signal(&self) -> usize {
        self.signal
    }

    /// Number of leading NaN entries in every output line.
    pub fn lookback(&self) -> usize {
        self.fast.max(self.slow) + self.signal - 1
    }

    pub fn compute(&self, closes: &[f64]) -> MacdSeries {
        let n = closes.len();
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);

        let mut macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let mut signal = ema_of_series(&macd, self.signal);

        // The signal EMA already starts at the lookback; the mask keeps the
        // MACD line aligned with it.
        let warmup = self.lookback().min(n);
        for v in &mut macd[..warmup] {
            *v = f64::NAN;
        }
        for v in &mut signal[..warmup] {
            *v = f64::NAN;
        }

        let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
        MacdSeries {
            macd,
            signal,
            histogram,
        }
    }
}

impl MacdSeries {
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    /// Sample at bar `i`. Panics if `i` is out of bounds.
    pub fn sample(&self, i: usize) -> IndicatorSample {
        IndicatorSample {
            macd: self.macd[i],
            signal: self.signal[i],
            histogram: self.histogram[i],
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = IndicatorSample> + '_ {
        (0..self.len()).map(move |i| self.sample(i))
    }
}
