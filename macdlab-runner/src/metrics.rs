//! Performance metrics: pure functions over an equity curve and a trade list.
//!
//! Every metric is a pure function. Degenerate inputs (flat curve, no trades,
//! no losing trades) resolve to 0 or `None`, never to an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use macdlab_core::domain::{Bar, EquityPoint, Trade};

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Aggregate performance metrics for a single backtest run.
///
/// Percentages are in percent units (7.5 = 7.5%). Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_secs: i64,
    pub exposure_time_pct: f64,
    pub equity_final: f64,
    pub equity_peak: f64,
    pub return_pct: f64,
    pub buy_hold_return_pct: Option<f64>,
    pub return_ann_pct: f64,
    pub volatility_ann_pct: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Largest drawdown depth, reported negative.
    pub max_drawdown_pct: f64,
    pub avg_drawdown_pct: f64,
    pub max_drawdown_duration_secs: Option<i64>,
    pub avg_drawdown_duration_secs: Option<i64>,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub best_trade_pct: Option<f64>,
    pub worst_trade_pct: Option<f64>,
    pub avg_trade_pct: Option<f64>,
    pub max_trade_duration_secs: Option<i64>,
    pub avg_trade_duration_secs: Option<i64>,
    /// `None` when there are no losing trades.
    pub profit_factor: Option<f64>,
    pub expectancy_pct: Option<f64>,
    pub sqn: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics. Open trades in `trades` are ignored.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_cash: f64,
        annualization_factor: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let closed: Vec<&Trade> = trades.iter().filter(|t| !t.is_open).collect();
        let trade_returns: Vec<f64> = closed.iter().filter_map(|t| t.return_pct()).collect();
        let trade_durations: Vec<i64> = closed
            .iter()
            .filter_map(|t| t.duration())
            .map(|d| d.num_seconds())
            .collect();

        let start = equity_curve.first().map(|p| p.timestamp);
        let end = equity_curve.last().map(|p| p.timestamp);
        let equity_final = equity.last().copied().unwrap_or(initial_cash);

        let returns = period_returns(&equity);
        let ann_return = annualized_return(&equity, initial_cash, annualization_factor);
        let ann_vol = annualized_volatility(&returns, annualization_factor);
        let episodes = drawdown_episodes(equity_curve, initial_cash);
        let max_dd = episodes.iter().map(|e| e.depth).fold(0.0_f64, f64::max);

        Self {
            start,
            end,
            duration_secs: match (start, end) {
                (Some(s), Some(e)) => (e - s).num_seconds(),
                _ => 0,
            },
            exposure_time_pct: exposure_time(equity_curve) * 100.0,
            equity_final,
            equity_peak: equity.iter().copied().fold(initial_cash, f64::max),
            return_pct: total_return(equity_final, initial_cash) * 100.0,
            buy_hold_return_pct: None,
            return_ann_pct: ann_return * 100.0,
            volatility_ann_pct: ann_vol * 100.0,
            sharpe: sharpe_ratio(ann_return, ann_vol),
            sortino: sortino_ratio(ann_return, &returns, annualization_factor),
            calmar: calmar_ratio(ann_return, max_dd),
            max_drawdown_pct: -max_dd * 100.0,
            avg_drawdown_pct: -mean_f64(&episodes.iter().map(|e| e.depth).collect::<Vec<_>>()) * 100.0,
            max_drawdown_duration_secs: episodes.iter().map(|e| e.duration_secs).max(),
            avg_drawdown_duration_secs: mean_secs(&episodes.iter().map(|e| e.duration_secs).collect::<Vec<_>>()),
            trade_count: closed.len(),
            win_rate_pct: win_rate(&closed) * 100.0,
            best_trade_pct: trade_returns.iter().copied().reduce(f64::max).map(|r| r * 100.0),
            worst_trade_pct: trade_returns.iter().copied().reduce(f64::min).map(|r| r * 100.0),
            avg_trade_pct: geometric_mean(&trade_returns).map(|r| r * 100.0),
            max_trade_duration_secs: trade_durations.iter().copied().max(),
            avg_trade_duration_secs: mean_secs(&trade_durations),
            profit_factor: profit_factor(&closed),
            expectancy_pct: (!trade_returns.is_empty()).then(|| mean_f64(&trade_returns) * 100.0),
            sqn: sqn(&trade_returns),
        }
    }

    /// Attach the buy-and-hold benchmark computed from the run's bars.
    pub fn with_benchmark(mut self, bars: &[Bar]) -> Self {
        self.buy_hold_return_pct = buy_and_hold_return(bars).map(|r| r * 100.0);
        self
    }
}

/// One maximal run of equity below its running peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownEpisode {
    pub peak_index: usize,
    pub trough_index: usize,
    /// Largest fractional decline from the peak within the run.
    pub depth: f64,
    /// Wall-clock seconds from the peak to the trough.
    pub duration_secs: i64,
}

// ─── Individual metric functions ────────────────────────────────────

/// Periods per year implied by the mean sampling interval (365-day year).
///
/// Returns 0.0 when fewer than two timestamps are given.
pub fn annualization_factor(timestamps: &[DateTime<Utc>]) -> f64 {
    let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) else {
        return 0.0;
    };
    if timestamps.len() < 2 {
        return 0.0;
    }
    let mean_interval = (*last - *first).num_milliseconds() as f64 / 1000.0 / (timestamps.len() - 1) as f64;
    if mean_interval <= 0.0 {
        return 0.0;
    }
    SECONDS_PER_YEAR / mean_interval
}

/// Total return as a fraction of initial cash.
pub fn total_return(final_equity: f64, initial_cash: f64) -> f64 {
    if initial_cash <= 0.0 {
        return 0.0;
    }
    final_equity / initial_cash - 1.0
}

/// `(1 + g)^factor - 1` where `g` is the geometric mean period return.
///
/// Growth is measured from `initial_cash` so a fill on the first bar counts.
pub fn annualized_return(equity: &[f64], initial_cash: f64, factor: f64) -> f64 {
    let n = equity.len().saturating_sub(1);
    if n == 0 || initial_cash <= 0.0 {
        return 0.0;
    }
    let growth = equity[n] / initial_cash;
    if growth <= 0.0 {
        return -1.0;
    }
    let g = growth.powf(1.0 / n as f64) - 1.0;
    (1.0 + g).powf(factor) - 1.0
}

/// Sample standard deviation of period returns scaled by `sqrt(factor)`.
pub fn annualized_volatility(returns: &[f64], factor: f64) -> f64 {
    std_dev(returns) * factor.sqrt()
}

/// Annualized return over annualized volatility; 0 when volatility is 0.
pub fn sharpe_ratio(ann_return: f64, ann_vol: f64) -> f64 {
    if ann_vol < 1e-15 {
        return 0.0;
    }
    ann_return / ann_vol
}

/// Annualized return over the annualized sample deviation of negative period
/// returns; 0 when there are no negative periods or the deviation is 0.
pub fn sortino_ratio(ann_return: f64, returns: &[f64], factor: f64) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let deviation = std_dev(&downside) * factor.sqrt();
    if deviation < 1e-15 {
        return 0.0;
    }
    ann_return / deviation
}

/// Annualized return over |max drawdown|; 0 without a drawdown.
pub fn calmar_ratio(ann_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown.abs() < 1e-15 {
        return 0.0;
    }
    ann_return / max_drawdown.abs()
}

/// Split the equity curve into drawdown episodes.
///
/// An episode starts on the first point below the running peak and lasts
/// until equity regains the peak. A final unrecovered run is still reported.
/// The running peak starts at `initial_cash`.
pub fn drawdown_episodes(curve: &[EquityPoint], initial_cash: f64) -> Vec<DrawdownEpisode> {
    let mut episodes = Vec::new();
    if curve.is_empty() {
        return episodes;
    }

    let mut peak = initial_cash;
    let mut peak_index = 0;
    let mut current: Option<DrawdownEpisode> = None;

    for (i, point) in curve.iter().enumerate() {
        if point.equity >= peak {
            episodes.extend(current.take());
            peak = point.equity;
            peak_index = i;
            continue;
        }
        if peak <= 0.0 {
            continue;
        }
        let depth = 1.0 - point.equity / peak;
        let episode = current.get_or_insert(DrawdownEpisode {
            peak_index,
            trough_index: i,
            depth: 0.0,
            duration_secs: 0,
        });
        if depth > episode.depth {
            episode.depth = depth;
            episode.trough_index = i;
            episode.duration_secs = (point.timestamp - curve[peak_index].timestamp).num_seconds();
        }
    }
    episodes.extend(current);
    episodes
}

/// Fraction of bars with an open position.
pub fn exposure_time(curve: &[EquityPoint]) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    curve.iter().filter(|p| p.in_market()).count() as f64 / curve.len() as f64
}

/// Close-to-close return of the first and last bar.
pub fn buy_and_hold_return(bars: &[Bar]) -> Option<f64> {
    let first = bars.first()?.close;
    let last = bars.last()?.close;
    (first > 0.0).then(|| last / first - 1.0)
}

/// Fraction of closed trades with positive PnL; 0 with no trades.
pub fn win_rate(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit over gross loss. `None` when nothing was lost.
pub fn profit_factor(trades: &[&Trade]) -> Option<f64> {
    let pnls = trades.iter().filter_map(|t| t.pnl);
    let (gross_profit, gross_loss) = pnls.fold((0.0_f64, 0.0_f64), |(p, l), pnl| {
        if pnl > 0.0 {
            (p + pnl, l)
        } else {
            (p, l - pnl.min(0.0))
        }
    });
    (gross_loss > 0.0).then(|| gross_profit / gross_loss)
}

/// System Quality Number: sqrt(n) · mean / std of per-trade returns.
pub fn sqn(trade_returns: &[f64]) -> f64 {
    let n = trade_returns.len();
    let std = std_dev(trade_returns);
    if n < 2 || std < 1e-15 {
        return 0.0;
    }
    (n as f64).sqrt() * mean_f64(trade_returns) / std
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Geometric mean of fractional returns.
pub fn geometric_mean(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let log_sum: f64 = returns.iter().map(|r| (1.0 + r).max(0.0).ln()).sum();
    Some((log_sum / returns.len() as f64).exp() - 1.0)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn mean_secs(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    Some((values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64).round() as i64)
}
