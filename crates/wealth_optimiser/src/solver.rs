//! Projected gradient ascent for concave quadratic objectives.
//!
//! Maximises `μᵀw − (λ/2)·wᵀΣw` over a [`FeasibleRegion`] with a fixed
//! step `1/(λ·L)`, where `L` is the Gershgorin bound on the largest
//! eigenvalue of `Σ`.

use crate::constraints::FeasibleRegion;
use wealth_core::math::Matrix;

/// Default iteration limit.
pub const MAX_ITERATIONS: usize = 2_000;

/// Convergence threshold on the largest weight change per step.
pub const STEP_TOLERANCE: f64 = 1e-10;

/// Raw solver output.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    /// Final weights
    pub weights: Vec<f64>,
    /// Iterations used
    pub iterations: usize,
    /// Whether the step tolerance was reached
    pub converged: bool,
}

/// Quadratic utility `μᵀw − (λ/2)·wᵀΣw`.
#[inline]
pub fn quadratic_utility(mu: &[f64], cov: &Matrix, risk_aversion: f64, w: &[f64]) -> f64 {
    let ret: f64 = mu.iter().zip(w).map(|(m, x)| m * x).sum();
    ret - 0.5 * risk_aversion * cov.quad_form(w)
}

/// Portfolio volatility `√(wᵀΣw)`.
#[inline]
pub fn portfolio_volatility(cov: &Matrix, w: &[f64]) -> f64 {
    cov.quad_form(w).max(0.0).sqrt()
}

/// Maximises the quadratic utility over `region`, starting from `start`.
pub fn maximise_utility(
    region: &FeasibleRegion,
    mu: &[f64],
    cov: &Matrix,
    risk_aversion: f64,
    start: &[f64],
) -> Solution {
    let lipschitz = risk_aversion * cov.max_abs_row_sum();
    let step = 1.0 / lipschitz.max(1e-8);
    let n = start.len();
    let mut w = region.project(start);

    for iteration in 1..=MAX_ITERATIONS {
        let sigma_w = matrix_vector(cov, &w);
        let candidate: Vec<f64> = (0..n)
            .map(|i| {
                if region.is_fixed(i) {
                    w[i]
                } else {
                    w[i] + step * (mu[i] - risk_aversion * sigma_w[i])
                }
            })
            .collect();
        let next = region.project(&candidate);
        let change = next
            .iter()
            .zip(&w)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        w = next;
        if change < STEP_TOLERANCE {
            return Solution {
                weights: w,
                iterations: iteration,
                converged: true,
            };
        }
    }
    Solution {
        weights: w,
        iterations: MAX_ITERATIONS,
        converged: false,
    }
}

pub(crate) fn matrix_vector(m: &Matrix, x: &[f64]) -> Vec<f64> {
    (0..m.rows())
        .map(|i| m.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
        .collect()
}
