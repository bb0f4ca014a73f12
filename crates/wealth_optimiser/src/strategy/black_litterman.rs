//! Black-Litterman posterior returns.
//!
//! Equilibrium prior `π = δ·Σ·w_mkt`, view uncertainty
//! `Ω_kk = (1/c_k − 1)·(P·τΣ·Pᵀ)_kk` and posterior
//! `μ_BL = π + τΣPᵀ(PτΣPᵀ + Ω)⁻¹(Q − Pπ)`. Weights are the mean-variance
//! optimum of `μ_BL` at risk aversion `δ` under the constraint set.

use super::OptimisationStrategy;
use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::{matrix_vector, maximise_utility, quadratic_utility, Solution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wealth_core::math::{solve, Matrix};
use wealth_core::types::AssetId;

const MIN_VIEW_VARIANCE: f64 = 1e-12;

/// An investor view: a portfolio of assets and its expected return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View portfolio (a row of `P`)
    pub weights: BTreeMap<AssetId, f64>,
    /// Expected annual return of the view portfolio (`Q`)
    pub expected_return: f64,
    /// Confidence in (0, 1]
    pub confidence: f64,
}

impl View {
    /// Absolute view on a single asset.
    pub fn absolute(asset: impl Into<AssetId>, expected_return: f64, confidence: f64) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(asset.into(), 1.0);
        Self {
            weights,
            expected_return,
            confidence,
        }
    }

    /// Relative view: `long` outperforms `short` by `spread`.
    pub fn relative(
        long: impl Into<AssetId>,
        short: impl Into<AssetId>,
        spread: f64,
        confidence: f64,
    ) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(long.into(), 1.0);
        weights.insert(short.into(), -1.0);
        Self {
            weights,
            expected_return: spread,
            confidence,
        }
    }
}

/// Black-Litterman strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackLitterman {
    /// Uncertainty scaling of the prior
    pub tau: f64,
    /// Market risk aversion `δ`
    pub risk_aversion: f64,
    /// Investor views
    pub views: Vec<View>,
    /// Market-capitalisation weights; equal weights when absent
    pub market_weights: Option<BTreeMap<AssetId, f64>>,
}

impl Default for BlackLitterman {
    fn default() -> Self {
        Self {
            tau: 0.05,
            risk_aversion: 2.5,
            views: Vec::new(),
            market_weights: None,
        }
    }
}

impl BlackLitterman {
    /// Adds a view.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Sets the market weights.
    pub fn with_market_weights(mut self, weights: BTreeMap<AssetId, f64>) -> Self {
        self.market_weights = Some(weights);
        self
    }

    fn dense_market_weights(&self, problem: &OptimisationProblem) -> Vec<f64> {
        let n = problem.len();
        match &self.market_weights {
            Some(map) => {
                let raw: Vec<f64> = problem
                    .candidates
                    .iter()
                    .map(|c| map.get(&c.id).copied().unwrap_or(0.0))
                    .collect();
                let total: f64 = raw.iter().sum();
                if total > 0.0 {
                    raw.into_iter().map(|w| w / total).collect()
                } else {
                    vec![1.0 / n as f64; n]
                }
            }
            None => vec![1.0 / n as f64; n],
        }
    }

    /// Equilibrium prior returns `π = δ·Σ·w_mkt`.
    pub fn prior_returns(&self, problem: &OptimisationProblem) -> Vec<f64> {
        let w_mkt = self.dense_market_weights(problem);
        matrix_vector(&problem.covariance, &w_mkt)
            .into_iter()
            .map(|x| self.risk_aversion * x)
            .collect()
    }

    /// Posterior expected returns.
    ///
    /// # Errors
    ///
    /// Returns `OptimisationError::InvalidInput` for unknown view assets or
    /// confidences outside (0, 1], and a linear algebra error if the view
    /// system is singular.
    pub fn posterior_returns(
        &self,
        problem: &OptimisationProblem,
    ) -> Result<Vec<f64>, OptimisationError> {
        if !(self.tau > 0.0) || !(self.risk_aversion > 0.0) {
            return Err(OptimisationError::invalid(
                "Black-Litterman tau and risk aversion must be positive",
            ));
        }
        let prior = self.prior_returns(problem);
        if self.views.is_empty() {
            return Ok(prior);
        }
        let n = problem.len();
        let k = self.views.len();

        let mut p_rows = Vec::with_capacity(k);
        for view in &self.views {
            if !(view.confidence > 0.0 && view.confidence <= 1.0) {
                return Err(OptimisationError::invalid(format!(
                    "view confidence {} outside (0, 1]",
                    view.confidence
                )));
            }
            let mut row = vec![0.0; n];
            for (id, w) in &view.weights {
                let i = problem
                    .candidates
                    .iter()
                    .position(|c| &c.id == id)
                    .ok_or_else(|| {
                        OptimisationError::invalid(format!("view references unknown asset '{id}'"))
                    })?;
                row[i] = *w;
            }
            p_rows.push(row);
        }
        let p = Matrix::from_rows(p_rows)?;
        let tau_sigma = problem.covariance.scale(self.tau);
        let tau_sigma_pt = tau_sigma.mul(&p.transpose())?;
        let mut system = p.mul(&tau_sigma_pt)?;
        for (j, view) in self.views.iter().enumerate() {
            let omega = ((1.0 / view.confidence - 1.0) * system[(j, j)]).max(MIN_VIEW_VARIANCE);
            system[(j, j)] += omega;
        }
        let p_pi = matrix_vector(&p, &prior);
        let surprise: Vec<f64> = self
            .views
            .iter()
            .zip(&p_pi)
            .map(|(v, implied)| v.expected_return - implied)
            .collect();
        let x = solve(&system, &surprise)?;
        let adjustment = matrix_vector(&tau_sigma_pt, &x);
        Ok(prior.iter().zip(&adjustment).map(|(a, b)| a + b).collect())
    }
}

impl OptimisationStrategy for BlackLitterman {
    fn name(&self) -> &'static str {
        "black_litterman"
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        let mu = self.posterior_returns(problem)?;
        Ok(maximise_utility(
            region,
            &mu,
            &problem.covariance,
            self.risk_aversion,
            &region.starting_point(),
        ))
    }

    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        match self.posterior_returns(problem) {
            Ok(mu) => quadratic_utility(&mu, &problem.covariance, self.risk_aversion, weights),
            Err(_) => f64::NAN,
        }
    }
}
