//! Maximum Sharpe ratio along the constrained frontier.
//!
//! The constrained tangency portfolio lies on the mean-variance frontier.
//! The frontier is scanned over a log-spaced risk-aversion grid and the
//! best point refined by golden-section search in log risk aversion.

use super::OptimisationStrategy;
use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::{maximise_utility, portfolio_volatility, Solution};
use serde::{Deserialize, Serialize};

const GRID_POINTS: usize = 25;
const LOG10_LAMBDA_MIN: f64 = -2.0;
const LOG10_LAMBDA_MAX: f64 = 4.0;
const GOLDEN_STEPS: usize = 30;

/// Maximises `(μᵀw − r_f) / √(wᵀΣw)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaximumSharpe {
    /// Annual risk-free rate
    pub risk_free_rate: f64,
}

impl Default for MaximumSharpe {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
        }
    }
}

impl MaximumSharpe {
    /// Sharpe ratio of `weights`; `-∞` for a riskless portfolio.
    pub fn sharpe(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        let vol = portfolio_volatility(&problem.covariance, weights);
        if vol <= 1e-12 {
            return f64::NEG_INFINITY;
        }
        let ret: f64 = problem
            .expected_returns
            .iter()
            .zip(weights)
            .map(|(m, w)| m * w)
            .sum();
        (ret - self.risk_free_rate) / vol
    }
}

impl OptimisationStrategy for MaximumSharpe {
    fn name(&self) -> &'static str {
        "maximum_sharpe"
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        if !self.risk_free_rate.is_finite() {
            return Err(OptimisationError::invalid("risk-free rate must be finite"));
        }
        let mu = &problem.expected_returns;
        let cov = &problem.covariance;
        let start = region.starting_point();
        let mut iterations = 0;

        let step = (LOG10_LAMBDA_MAX - LOG10_LAMBDA_MIN) / (GRID_POINTS - 1) as f64;
        let mut frontier = Vec::with_capacity(GRID_POINTS);
        let mut warm = start.clone();
        for g in 0..GRID_POINTS {
            let log_lambda = LOG10_LAMBDA_MIN + step * g as f64;
            let solution = maximise_utility(region, mu, cov, 10f64.powf(log_lambda), &warm);
            iterations += solution.iterations;
            warm = solution.weights.clone();
            let sharpe = self.sharpe(problem, &solution.weights);
            frontier.push((log_lambda, sharpe, solution));
        }
        let best_index = frontier
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut lo = frontier[best_index.saturating_sub(1)].0;
        let mut hi = frontier[(best_index + 1).min(GRID_POINTS - 1)].0;
        let (_, mut best_sharpe, mut best) = frontier.swap_remove(best_index);

        let ratio = (5f64.sqrt() - 1.0) / 2.0;
        for _ in 0..GOLDEN_STEPS {
            if hi - lo < 1e-6 {
                break;
            }
            let a = hi - ratio * (hi - lo);
            let b = lo + ratio * (hi - lo);
            let sa = maximise_utility(region, mu, cov, 10f64.powf(a), &best.weights);
            let sb = maximise_utility(region, mu, cov, 10f64.powf(b), &best.weights);
            iterations += sa.iterations + sb.iterations;
            let (va, vb) = (self.sharpe(problem, &sa.weights), self.sharpe(problem, &sb.weights));
            if va >= vb {
                hi = b;
                if va > best_sharpe {
                    best_sharpe = va;
                    best = sa;
                }
            } else {
                lo = a;
                if vb > best_sharpe {
                    best_sharpe = vb;
                    best = sb;
                }
            }
        }
        Ok(Solution { iterations, ..best })
    }

    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        self.sharpe(problem, weights)
    }
}
