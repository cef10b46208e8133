//! Objective: configurable metric selector for optimizer ranking.
//!
//! Parses short names (`"Return"`, `"Sharpe"`) or exact report keys
//! (`"Return [%]"`, `"Sharpe Ratio"`). Higher is always better; drawdowns are
//! reported negative so that rule holds for them too.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::PerformanceMetrics;
use crate::report;

/// Which metric to maximize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    Return,
    ReturnAnn,
    EquityFinal,
    Sharpe,
    Sortino,
    Calmar,
    MaxDrawdown,
    AvgDrawdown,
    WinRate,
    BestTrade,
    AvgTrade,
    ProfitFactor,
    Expectancy,
    Sqn,
    TradeCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown objective metric: '{0}'")]
pub struct UnknownObjective(pub String);

impl Objective {
    pub const ALL: [Objective; 15] = [
        Self::Return,
        Self::ReturnAnn,
        Self::EquityFinal,
        Self::Sharpe,
        Self::Sortino,
        Self::Calmar,
        Self::MaxDrawdown,
        Self::AvgDrawdown,
        Self::WinRate,
        Self::BestTrade,
        Self::AvgTrade,
        Self::ProfitFactor,
        Self::Expectancy,
        Self::Sqn,
        Self::TradeCount,
    ];

    /// Exact report key of this metric.
    pub fn report_key(&self) -> &'static str {
        match self {
            Self::Return => report::RETURN,
            Self::ReturnAnn => report::RETURN_ANN,
            Self::EquityFinal => report::EQUITY_FINAL,
            Self::Sharpe => report::SHARPE,
            Self::Sortino => report::SORTINO,
            Self::Calmar => report::CALMAR,
            Self::MaxDrawdown => report::MAX_DRAWDOWN,
            Self::AvgDrawdown => report::AVG_DRAWDOWN,
            Self::WinRate => report::WIN_RATE,
            Self::BestTrade => report::BEST_TRADE,
            Self::AvgTrade => report::AVG_TRADE,
            Self::ProfitFactor => report::PROFIT_FACTOR,
            Self::Expectancy => report::EXPECTANCY,
            Self::Sqn => report::SQN,
            Self::TradeCount => report::TRADES,
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Self::Return => "return",
            Self::ReturnAnn => "return_ann",
            Self::EquityFinal => "equity",
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
            Self::Calmar => "calmar",
            Self::MaxDrawdown => "max_drawdown",
            Self::AvgDrawdown => "avg_drawdown",
            Self::WinRate => "win_rate",
            Self::BestTrade => "best_trade",
            Self::AvgTrade => "avg_trade",
            Self::ProfitFactor => "profit_factor",
            Self::Expectancy => "expectancy",
            Self::Sqn => "sqn",
            Self::TradeCount => "trades",
        }
    }

    /// Score a run. NaN marks "no value"; it ranks below everything.
    ///
    /// An undefined profit factor (no losing trades) scores +inf when at
    /// least one trade closed, -inf otherwise.
    pub fn extract(&self, m: &PerformanceMetrics) -> f64 {
        match self {
            Self::Return => m.return_pct,
            Self::ReturnAnn => m.return_ann_pct,
            Self::EquityFinal => m.equity_final,
            Self::Sharpe => m.sharpe,
            Self::Sortino => m.sortino,
            Self::Calmar => m.calmar,
            Self::MaxDrawdown => m.max_drawdown_pct,
            Self::AvgDrawdown => m.avg_drawdown_pct,
            Self::WinRate => m.win_rate_pct,
            Self::BestTrade => m.best_trade_pct.unwrap_or(f64::NAN),
            Self::AvgTrade => m.avg_trade_pct.unwrap_or(f64::NAN),
            Self::ProfitFactor => m.profit_factor.unwrap_or(if m.trade_count > 0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }),
            Self::Expectancy => m.expectancy_pct.unwrap_or(f64::NAN),
            Self::Sqn => m.sqn,
            Self::TradeCount => m.trade_count as f64,
        }
    }

    /// Returns true if score `a` strictly beats `b`. NaN never beats anything
    /// and loses to any number.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        match (a.is_nan(), b.is_nan()) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => a > b,
        }
    }
}

impl FromStr for Objective {
    type Err = UnknownObjective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|o| {
                o.report_key() == trimmed
                    || o.short_name() == normalized
                    || o.report_key().to_ascii_lowercase() == trimmed.to_ascii_lowercase()
            })
            .or(match normalized.as_str() {
                "sharpe_ratio" => Some(Self::Sharpe),
                "sortino_ratio" => Some(Self::Sortino),
                "calmar_ratio" => Some(Self::Calmar),
                "drawdown" => Some(Self::MaxDrawdown),
                "winrate" => Some(Self::WinRate),
                _ => None,
            })
            .ok_or_else(|| UnknownObjective(trimmed.to_string()))
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.report_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macdlab_core::domain::EquityPoint;

    fn metrics() -> PerformanceMetrics {
        let curve: Vec<EquityPoint> = Vec::new();
        let mut m = PerformanceMetrics::compute(&curve, &[], 10_000.0, 0.0);
        m.return_pct = 12.5;
        m.sharpe = 1.5;
        m.max_drawdown_pct = -10.0;
        m
    }

    #[test]
    fn parses_short_names_and_report_keys() {
        assert_eq!("Return".parse::<Objective>().unwrap(), Objective::Return);
        assert_eq!("Return [%]".parse::<Objective>().unwrap(), Objective::Return);
        assert_eq!("sharpe".parse::<Objective>().unwrap(), Objective::Sharpe);
        assert_eq!("Sharpe Ratio".parse::<Objective>().unwrap(), Objective::Sharpe);
        assert_eq!("SQN".parse::<Objective>().unwrap(), Objective::Sqn);
        assert_eq!("Max. Drawdown [%]".parse::<Objective>().unwrap(), Objective::MaxDrawdown);
        assert_eq!("profit factor".parse::<Objective>().unwrap(), Objective::ProfitFactor);
        assert_eq!("# Trades".parse::<Objective>().unwrap(), Objective::TradeCount);
    }

    #[test]
    fn rejects_unknown() {
        let err = "Moon Phase".parse::<Objective>().unwrap_err();
        assert_eq!(err, UnknownObjective("Moon Phase".into()));
    }

    #[test]
    fn every_objective_round_trips_through_its_key() {
        for o in Objective::ALL {
            assert_eq!(o.report_key().parse::<Objective>().unwrap(), o);
            assert_eq!(o.to_string().parse::<Objective>().unwrap(), o);
        }
    }

    #[test]
    fn extract_values() {
        let m = metrics();
        assert_eq!(Objective::Return.extract(&m), 12.5);
        assert_eq!(Objective::Sharpe.extract(&m), 1.5);
        assert_eq!(Objective::MaxDrawdown.extract(&m), -10.0);
        assert!(Objective::BestTrade.extract(&m).is_nan());
        assert_eq!(Objective::ProfitFactor.extract(&m), f64::NEG_INFINITY);
    }

    #[test]
    fn undefined_profit_factor_with_trades_ranks_top() {
        let mut m = metrics();
        m.trade_count = 2;
        assert_eq!(Objective::ProfitFactor.extract(&m), f64::INFINITY);
    }

    #[test]
    fn nan_ranks_lowest() {
        let o = Objective::Return;
        assert!(o.is_better(-1e9, f64::NAN));
        assert!(!o.is_better(f64::NAN, -1e9));
        assert!(!o.is_better(f64::NAN, f64::NAN));
        assert!(o.is_better(2.0, 1.0));
        assert!(!o.is_better(1.0, 1.0));
    }

    #[test]
    fn drawdown_closer_to_zero_is_better() {
        assert!(Objective::MaxDrawdown.is_better(-5.0, -20.0));
    }

    #[test]
    fn default_is_return() {
        assert_eq!(Objective::default(), Objective::Return);
    }
}
