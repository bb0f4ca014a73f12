//! Portfolio construction strategies.
//!
//! This module provides `StrategyKind` for static dispatch over the
//! supported strategies and the [`StrategySelector`] that picks one per
//! client.
//!
//! ## Strategies
//!
//! - `MeanVariance`: frontier point at a risk aversion or target volatility
//! - `BlackLitterman`: equilibrium prior blended with investor views
//! - `RiskParity`: equal (or budgeted) risk contribution
//! - `MinimumVariance`: lowest-volatility feasible portfolio
//! - `MaximumSharpe`: tangency portfolio under the constraints
//!
//! ## Example
//!
//! ```
//! use wealth_core::types::WealthSegment;
//! use wealth_optimiser::strategy::{OptimisationStrategy, StrategyKind, StrategySelector};
//!
//! let selector = StrategySelector::new(StrategyKind::mean_variance())
//!     .with_segment_override(WealthSegment::Uhnw, StrategyKind::risk_parity());
//!
//! assert_eq!(selector.select(WealthSegment::Uhnw, 5.0).name(), "risk_parity");
//! assert_eq!(selector.select(WealthSegment::Hnw, 5.0).name(), "mean_variance");
//! ```

mod black_litterman;
mod maximum_sharpe;
mod mean_variance;
mod minimum_variance;
mod risk_parity;

pub use black_litterman::{BlackLitterman, View};
pub use maximum_sharpe::MaximumSharpe;
pub use mean_variance::MeanVariance;
pub use minimum_variance::MinimumVariance;
pub use risk_parity::RiskParity;

use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::Solution;
use serde::{Deserialize, Serialize};
use wealth_core::types::WealthSegment;

/// Behaviour shared by all strategies.
pub trait OptimisationStrategy {
    /// Strategy name.
    fn name(&self) -> &'static str;

    /// Finds target weights inside `region`.
    ///
    /// # Errors
    ///
    /// Returns `OptimisationError::InvalidInput` for strategy parameters
    /// that do not fit the problem.
    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError>;

    /// Strategy objective evaluated at `weights`.
    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64;
}

/// Static dispatch enum over the strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Mean-variance utility
    MeanVariance(MeanVariance),
    /// Black-Litterman posterior with mean-variance weights
    BlackLitterman(BlackLitterman),
    /// Risk parity
    RiskParity(RiskParity),
    /// Minimum variance
    MinimumVariance,
    /// Maximum Sharpe ratio
    MaximumSharpe(MaximumSharpe),
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::mean_variance()
    }
}

impl StrategyKind {
    /// Mean-variance at the client's risk aversion.
    pub fn mean_variance() -> Self {
        StrategyKind::MeanVariance(MeanVariance::default())
    }

    /// Black-Litterman with default τ and δ and no views.
    pub fn black_litterman() -> Self {
        StrategyKind::BlackLitterman(BlackLitterman::default())
    }

    /// Equal risk contribution.
    pub fn risk_parity() -> Self {
        StrategyKind::RiskParity(RiskParity::default())
    }

    /// Maximum Sharpe with a 2% risk-free rate.
    pub fn maximum_sharpe() -> Self {
        StrategyKind::MaximumSharpe(MaximumSharpe::default())
    }

    /// Strategy implied by a client's risk tolerance on the 0–10 scale:
    /// maximum Sharpe from 7, risk parity from 4, minimum variance below.
    pub fn for_risk_tolerance(risk_tolerance: f64) -> Self {
        if risk_tolerance >= 7.0 {
            Self::maximum_sharpe()
        } else if risk_tolerance >= 4.0 {
            Self::risk_parity()
        } else {
            StrategyKind::MinimumVariance
        }
    }
}

impl OptimisationStrategy for StrategyKind {
    fn name(&self) -> &'static str {
        match self {
            StrategyKind::MeanVariance(s) => s.name(),
            StrategyKind::BlackLitterman(s) => s.name(),
            StrategyKind::RiskParity(s) => s.name(),
            StrategyKind::MinimumVariance => MinimumVariance.name(),
            StrategyKind::MaximumSharpe(s) => s.name(),
        }
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        match self {
            StrategyKind::MeanVariance(s) => s.solve(problem, region),
            StrategyKind::BlackLitterman(s) => s.solve(problem, region),
            StrategyKind::RiskParity(s) => s.solve(problem, region),
            StrategyKind::MinimumVariance => MinimumVariance.solve(problem, region),
            StrategyKind::MaximumSharpe(s) => s.solve(problem, region),
        }
    }

    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        match self {
            StrategyKind::MeanVariance(s) => s.objective(problem, weights),
            StrategyKind::BlackLitterman(s) => s.objective(problem, weights),
            StrategyKind::RiskParity(s) => s.objective(problem, weights),
            StrategyKind::MinimumVariance => MinimumVariance.objective(problem, weights),
            StrategyKind::MaximumSharpe(s) => s.objective(problem, weights),
        }
    }
}

/// Strategy assigned to one wealth segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentStrategy {
    /// Segment the override applies to
    pub segment: WealthSegment,
    /// Strategy for that segment
    pub strategy: StrategyKind,
}

/// Chooses a strategy per client.
///
/// Segment overrides win; otherwise the default strategy is used, or the
/// risk-tolerance rule of [`StrategyKind::for_risk_tolerance`] when
/// `by_risk_tolerance` is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySelector {
    /// Strategy used without an override
    pub default: StrategyKind,
    /// Select by risk tolerance instead of `default`
    pub by_risk_tolerance: bool,
    /// Per-segment overrides
    pub segment_overrides: Vec<SegmentStrategy>,
}

impl StrategySelector {
    /// Selector that always returns `default`.
    pub fn new(default: StrategyKind) -> Self {
        Self {
            default,
            by_risk_tolerance: false,
            segment_overrides: Vec::new(),
        }
    }

    /// Selector driven by risk tolerance.
    pub fn by_risk_tolerance() -> Self {
        Self {
            by_risk_tolerance: true,
            ..Self::default()
        }
    }

    /// Adds or replaces the override for `segment`.
    pub fn with_segment_override(mut self, segment: WealthSegment, strategy: StrategyKind) -> Self {
        self.segment_overrides.retain(|o| o.segment != segment);
        self.segment_overrides.push(SegmentStrategy { segment, strategy });
        self
    }

    /// Strategy for a client in `segment` with `risk_tolerance`.
    pub fn select(&self, segment: WealthSegment, risk_tolerance: f64) -> StrategyKind {
        if let Some(o) = self.segment_overrides.iter().find(|o| o.segment == segment) {
            return o.strategy.clone();
        }
        if self.by_risk_tolerance {
            StrategyKind::for_risk_tolerance(risk_tolerance)
        } else {
            self.default.clone()
        }
    }
}
