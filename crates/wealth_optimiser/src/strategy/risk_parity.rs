//! Risk parity by cyclical coordinate descent.
//!
//! Minimises `½·yᵀΣy − Σ bᵢ·ln yᵢ` over `y > 0`; the normalised minimiser
//! `w = y / Σy` has risk contributions `wᵢ·(Σw)ᵢ` proportional to the
//! budgets `b`. The result is then projected onto the constraint set.

use super::OptimisationStrategy;
use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::{matrix_vector, Solution};
use serde::{Deserialize, Serialize};
use wealth_core::math::Matrix;

const MAX_SWEEPS: usize = 10_000;
const SWEEP_TOLERANCE: f64 = 1e-12;
const MIN_VARIANCE: f64 = 1e-14;

/// Equal (or budgeted) risk contribution.
///
/// Assets with zero variance contribute no risk and are left out of the
/// risk budgeting; they only receive weight if the constraints require it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParity {
    /// Relative risk budgets aligned with the candidates; equal when absent
    pub budgets: Option<Vec<f64>>,
}

impl RiskParity {
    /// Risk parity with explicit budgets.
    pub fn with_budgets(budgets: Vec<f64>) -> Self {
        Self {
            budgets: Some(budgets),
        }
    }

    fn normalised_budgets(&self, n: usize, included: &[bool]) -> Result<Vec<f64>, OptimisationError> {
        let raw = match &self.budgets {
            Some(b) => {
                if b.len() != n {
                    return Err(OptimisationError::DimensionMismatch {
                        context: "risk budgets",
                        expected: n,
                        found: b.len(),
                    });
                }
                if b.iter().any(|x| !(*x > 0.0)) {
                    return Err(OptimisationError::invalid("risk budgets must be positive"));
                }
                b.clone()
            }
            None => vec![1.0; n],
        };
        let masked: Vec<f64> = raw
            .iter()
            .zip(included)
            .map(|(b, inc)| if *inc { *b } else { 0.0 })
            .collect();
        let total: f64 = masked.iter().sum();
        Ok(if total > 0.0 {
            masked.into_iter().map(|b| b / total).collect()
        } else {
            masked
        })
    }
}

/// Unconstrained risk-budgeting weights.
///
/// Returns the weights and the number of sweeps, or `None` if no asset has
/// positive variance.
pub fn risk_budget_weights(cov: &Matrix, budgets: &[f64]) -> Option<(Vec<f64>, usize, bool)> {
    let n = cov.rows();
    let active: Vec<usize> = (0..n).filter(|&i| budgets[i] > 0.0 && cov[(i, i)] > MIN_VARIANCE).collect();
    if active.is_empty() {
        return None;
    }
    let mut y = vec![0.0; n];
    for &i in &active {
        y[i] = 1.0 / cov[(i, i)].sqrt();
    }
    let mut converged = false;
    let mut sweeps = 0;
    while sweeps < MAX_SWEEPS {
        sweeps += 1;
        let mut max_change = 0.0_f64;
        let mut max_level = 0.0_f64;
        for &i in &active {
            let sii = cov[(i, i)];
            let c: f64 = active
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| cov[(i, j)] * y[j])
                .sum();
            let updated = (-c + (c * c + 4.0 * sii * budgets[i]).sqrt()) / (2.0 * sii);
            max_change = max_change.max((updated - y[i]).abs());
            max_level = max_level.max(updated.abs());
            y[i] = updated;
        }
        if max_change <= SWEEP_TOLERANCE * max_level.max(1.0) {
            converged = true;
            break;
        }
    }
    let total: f64 = y.iter().sum();
    Some((y.into_iter().map(|v| v / total).collect(), sweeps, converged))
}

/// Risk contributions `wᵢ·(Σw)ᵢ / wᵀΣw`.
pub fn risk_contributions(cov: &Matrix, weights: &[f64]) -> Vec<f64> {
    let sigma_w = matrix_vector(cov, weights);
    let variance: f64 = weights.iter().zip(&sigma_w).map(|(w, s)| w * s).sum();
    if !(variance > 0.0) {
        return vec![0.0; weights.len()];
    }
    weights
        .iter()
        .zip(&sigma_w)
        .map(|(w, s)| w * s / variance)
        .collect()
}

impl OptimisationStrategy for RiskParity {
    fn name(&self) -> &'static str {
        "risk_parity"
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        let n = problem.len();
        let cov = &problem.covariance;
        let included: Vec<bool> = (0..n).map(|i| cov[(i, i)] > MIN_VARIANCE).collect();
        let budgets = self.normalised_budgets(n, &included)?;
        match risk_budget_weights(cov, &budgets) {
            Some((raw, sweeps, converged)) => Ok(Solution {
                weights: region.project(&raw),
                iterations: sweeps,
                converged,
            }),
            None => Ok(Solution {
                weights: region.starting_point(),
                iterations: 0,
                converged: true,
            }),
        }
    }

    /// Squared deviation of risk contributions from the budgets.
    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        let n = problem.len();
        let cov = &problem.covariance;
        let included: Vec<bool> = (0..n).map(|i| cov[(i, i)] > MIN_VARIANCE).collect();
        let budgets = match self.normalised_budgets(n, &included) {
            Ok(b) => b,
            Err(_) => return f64::NAN,
        };
        risk_contributions(cov, weights)
            .iter()
            .zip(&budgets)
            .map(|(rc, b)| (rc - b).powi(2))
            .sum()
    }
}
