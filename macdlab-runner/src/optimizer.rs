//! Parameter optimizer: exhaustive grid search over MACD periods and sizes.
//!
//! Combinations are enumerated in fixed lexicographic order
//! (fast, slow, signal, size), filtered by a constraint, and evaluated in
//! parallel on a rayon pool. Indexed collect keeps results in enumeration
//! order, so the winner (ties → earliest) is independent of scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use macdlab_core::domain::{Bar, StrategyParameters};
use macdlab_core::engine::SimulationConfig;

use crate::metrics::{annualization_factor, PerformanceMetrics};
use crate::objective::Objective;
use crate::runner::{evaluate, run_backtest, BacktestResult, RunError};

/// Errors from the optimizer.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("search space is empty: no combination satisfies the constraint")]
    EmptySearchSpace,
    #[error("all {attempted} combinations failed; first error: {first_error}")]
    AllCombinationsFailed { attempted: usize, first_error: String },
    #[error("optimization cancelled before any combination completed")]
    Cancelled,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error("re-running best combination failed: {0}")]
    Run(#[from] RunError),
}

/// Inclusive integer range `start..=end` stepped by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub start: usize,
    pub end: usize,
    #[serde(default = "default_step")]
    pub step: usize,
}

fn default_step() -> usize {
    1
}

impl ParamRange {
    pub fn new(start: usize, end: usize, step: usize) -> Self {
        Self { start, end, step }
    }

    pub fn single(value: usize) -> Self {
        Self::new(value, value, 1)
    }

    pub fn validate(&self, name: &str) -> Result<(), OptimizeError> {
        if self.step == 0 || self.start == 0 || self.start > self.end {
            return Err(OptimizeError::InvalidParameter(format!(
                "{name} range {}..={} step {} is invalid (need 0 < start <= end, step > 0)",
                self.start, self.end, self.step
            )));
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step).collect()
    }
}

/// Grid of candidate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub fast: ParamRange,
    pub slow: ParamRange,
    pub signal: ParamRange,
    pub position_sizes: Vec<f64>,
}

impl Default for SearchSpace {
    /// fast 8..=15, slow 20..=29, signal 6..=11, sizes 0.5..=0.9 by 0.1.
    fn default() -> Self {
        Self {
            fast: ParamRange::new(8, 15, 1),
            slow: ParamRange::new(20, 29, 1),
            signal: ParamRange::new(6, 11, 1),
            position_sizes: vec![0.5, 0.6, 0.7, 0.8, 0.9],
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), OptimizeError> {
        self.fast.validate("fast")?;
        self.slow.validate("slow")?;
        self.signal.validate("signal")?;
        if let Some(bad) = self.position_sizes.iter().find(|s| !(**s > 0.0 && **s <= 1.0)) {
            return Err(OptimizeError::InvalidParameter(format!(
                "position size {bad} is outside (0, 1]"
            )));
        }
        Ok(())
    }

    /// Total grid size before the constraint is applied.
    pub fn size(&self) -> usize {
        self.fast.values().len()
            * self.slow.values().len()
            * self.signal.values().len()
            * self.position_sizes.len()
    }

    /// All combinations in lexicographic (fast, slow, signal, size) order.
    pub fn combinations(&self) -> Vec<StrategyParameters> {
        let mut out = Vec::with_capacity(self.size());
        for fast in self.fast.values() {
            for slow in self.slow.values() {
                for signal in self.signal.values() {
                    for &size in &self.position_sizes {
                        out.push(StrategyParameters::new(fast, slow, signal, size));
                    }
                }
            }
        }
        out
    }
}

/// Predicate a combination must satisfy to be evaluated.
pub type Constraint = Box<dyn Fn(&StrategyParameters) -> bool + Send + Sync>;

/// Default constraint: fast period strictly below slow period.
pub fn fast_below_slow(p: &StrategyParameters) -> bool {
    p.fast_period < p.slow_period
}

/// One successfully evaluated combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub params: StrategyParameters,
    pub score: f64,
    pub metrics: PerformanceMetrics,
}

/// A combination that errored; excluded from ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEvaluation {
    pub params: StrategyParameters,
    pub error: String,
}

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub objective: Objective,
    /// Full result of the winning combination.
    pub best: BacktestResult,
    pub best_score: f64,
    /// Successful evaluations in enumeration order.
    pub evaluations: Vec<Evaluation>,
    pub failures: Vec<FailedEvaluation>,
    /// Combinations not started because of cancellation.
    pub cancelled: usize,
}

impl OptimizationResult {
    pub fn best_params(&self) -> &StrategyParameters {
        &self.best.params
    }

    /// Evaluations sorted best-first (stable: ties keep enumeration order).
    pub fn ranked(&self) -> Vec<&Evaluation> {
        let mut ranked: Vec<&Evaluation> = self.evaluations.iter().collect();
        ranked.sort_by(|a, b| {
            if self.objective.is_better(a.score, b.score) {
                std::cmp::Ordering::Less
            } else if self.objective.is_better(b.score, a.score) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        ranked
    }
}

enum Outcome {
    Done(Evaluation),
    /// Data error; the combination is excluded.
    Failed(FailedEvaluation),
    /// Configuration error; the whole run fails.
    Invalid(String),
    Skipped,
}

/// Grid-search optimizer.
pub struct Optimizer {
    space: SearchSpace,
    objective: Objective,
    config: SimulationConfig,
    constraint: Constraint,
    threads: Option<usize>,
    cancel: Arc<AtomicBool>,
}

impl Optimizer {
    pub fn new(space: SearchSpace, objective: Objective, config: SimulationConfig) -> Self {
        Self {
            space,
            objective,
            config,
            constraint: Box::new(fast_below_slow),
            threads: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&StrategyParameters) -> bool + Send + Sync + 'static,
    {
        self.constraint = Box::new(constraint);
        self
    }

    /// Bound the worker pool. `None` uses rayon's global pool (one per core).
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Share an external cancellation flag.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle that stops further combinations from starting when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Combinations that pass the constraint, in enumeration order.
    pub fn candidates(&self) -> Vec<StrategyParameters> {
        self.space
            .combinations()
            .into_iter()
            .filter(|p| (self.constraint)(p))
            .collect()
    }

    pub fn run(&self, bars: &[Bar]) -> Result<OptimizationResult, OptimizeError> {
        self.space.validate()?;
        self.config
            .validate()
            .map_err(|e| OptimizeError::InvalidParameter(e.to_string()))?;

        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(OptimizeError::EmptySearchSpace);
        }

        let _span = tracing::info_span!(
            "optimize",
            objective = %self.objective,
            combinations = candidates.len()
        )
        .entered();

        let outcomes = match self.threads {
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| OptimizeError::ThreadPool(e.to_string()))?
                .install(|| self.evaluate_all(bars, &candidates)),
            None => self.evaluate_all(bars, &candidates),
        };

        let mut evaluations = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Done(e) => evaluations.push(e),
                Outcome::Failed(f) => failures.push(f),
                Outcome::Invalid(msg) => return Err(OptimizeError::InvalidParameter(msg)),
                Outcome::Skipped => cancelled += 1,
            }
        }

        let mut best: Option<&Evaluation> = None;
        for e in &evaluations {
            match best {
                Some(b) if !self.objective.is_better(e.score, b.score) => {}
                _ => best = Some(e),
            }
        }
        let Some(best) = best else {
            return Err(match failures.first() {
                Some(f) => OptimizeError::AllCombinationsFailed {
                    attempted: failures.len(),
                    first_error: f.error.clone(),
                },
                None => OptimizeError::Cancelled,
            });
        };

        info!(
            best = %best.params,
            score = best.score,
            evaluated = evaluations.len(),
            failed = failures.len(),
            cancelled,
            "optimization complete"
        );
        let best_score = best.score;
        let best = run_backtest(bars, &best.params, &self.config)?;

        Ok(OptimizationResult {
            objective: self.objective,
            best,
            best_score,
            evaluations,
            failures,
            cancelled,
        })
    }

    fn evaluate_all(&self, bars: &[Bar], candidates: &[StrategyParameters]) -> Vec<Outcome> {
        let timestamps: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        let factor = annualization_factor(&timestamps);
        let aborted = AtomicBool::new(false);

        candidates
            .par_iter()
            .map(|params| {
                if self.cancel.load(Ordering::Relaxed) || aborted.load(Ordering::Relaxed) {
                    return Outcome::Skipped;
                }
                match evaluate(bars, params, &self.config, factor) {
                    Ok(metrics) => Outcome::Done(Evaluation {
                        params: *params,
                        score: self.objective.extract(&metrics),
                        metrics,
                    }),
                    Err(e) if is_isolated(&e) => {
                        warn!(params = %params, error = %e, "combination failed");
                        Outcome::Failed(FailedEvaluation {
                            params: *params,
                            error: e.to_string(),
                        })
                    }
                    Err(e) => {
                        aborted.store(true, Ordering::Relaxed);
                        Outcome::Invalid(format!("{params}: {e}"))
                    }
                }
            })
            .collect()
    }
}

/// Only data errors are isolated per combination.
fn is_isolated(err: &RunError) -> bool {
    match err {
        RunError::Core(e) => e.is_data_error(),
        RunError::Data(_) => true,
        RunError::Config(_) => false,
    }
}
