//! Value at Risk and expected shortfall.
//!
//! Losses are measured as `V0 − V_T` (positive = loss). Historical VaR is the
//! type-7 quantile of the loss sample and CVaR is the mean of losses at or
//! beyond it, so `CVaR ≥ VaR` always holds.
//!
//! Parametric estimates fit the loss sample:
//!
//! - Normal: `μ + σ·z_p`
//! - Cornish-Fisher: `μ + σ·z_cf` with
//!   `z_cf = z + (z²−1)S/6 + (z³−3z)K/24 − (2z³−5z)S²/36`

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use wealth_core::math::statistics::{
    excess_kurtosis, mean, normal_inv_cdf, quantile_sorted, skewness, std_dev,
};

/// Parametric loss distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParametricMethod {
    /// Gaussian fit
    Normal,
    /// Gaussian with skew and kurtosis adjustment
    CornishFisher,
}

/// VaR measures at one confidence level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    /// Confidence level
    pub confidence_level: f64,
    /// Empirical quantile of losses
    pub historical_var: f64,
    /// Mean of losses at or beyond `historical_var`
    pub cvar: f64,
    /// Normal parametric VaR
    pub normal_var: f64,
    /// Cornish-Fisher parametric VaR
    pub cornish_fisher_var: f64,
}

impl VarEstimate {
    /// Estimates every measure from an unsorted loss sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use wealth_risk::var::VarEstimate;
    ///
    /// let losses: Vec<f64> = (1..=100).map(f64::from).collect();
    /// let est = VarEstimate::from_losses(&losses, 0.95).unwrap();
    /// assert!((est.historical_var - 95.05).abs() < 1e-9);
    /// assert!(est.cvar >= est.historical_var);
    /// ```
    pub fn from_losses(losses: &[f64], confidence_level: f64) -> Result<Self, RiskError> {
        let sorted = sorted_losses(losses)?;
        Self::from_sorted(&sorted, confidence_level)
    }

    /// As [`VarEstimate::from_losses`] on an ascending-sorted sample.
    pub fn from_sorted(sorted: &[f64], confidence_level: f64) -> Result<Self, RiskError> {
        RiskError::check_confidence(confidence_level)?;
        if sorted.is_empty() {
            return Err(RiskError::EmptySample);
        }
        let historical_var = quantile_sorted(sorted, confidence_level);
        Ok(Self {
            confidence_level,
            historical_var,
            cvar: tail_mean(sorted, historical_var),
            normal_var: parametric_var(sorted, confidence_level, ParametricMethod::Normal)?,
            cornish_fisher_var: parametric_var(
                sorted,
                confidence_level,
                ParametricMethod::CornishFisher,
            )?,
        })
    }
}

/// Losses `initial − final` per path.
pub fn losses(initial_values: &[f64], final_values: &[f64]) -> Result<Vec<f64>, RiskError> {
    if initial_values.len() != final_values.len() {
        return Err(RiskError::DimensionMismatch {
            context: "initial vs final values",
            expected: initial_values.len(),
            found: final_values.len(),
        });
    }
    Ok(initial_values
        .iter()
        .zip(final_values)
        .map(|(v0, vt)| v0 - vt)
        .collect())
}

/// Historical VaR at `confidence_level`.
pub fn historical_var(losses: &[f64], confidence_level: f64) -> Result<f64, RiskError> {
    RiskError::check_confidence(confidence_level)?;
    let sorted = sorted_losses(losses)?;
    Ok(quantile_sorted(&sorted, confidence_level))
}

/// Historical CVaR (expected shortfall) at `confidence_level`.
pub fn historical_cvar(losses: &[f64], confidence_level: f64) -> Result<f64, RiskError> {
    RiskError::check_confidence(confidence_level)?;
    let sorted = sorted_losses(losses)?;
    let var = quantile_sorted(&sorted, confidence_level);
    Ok(tail_mean(&sorted, var))
}

/// Parametric VaR of `losses` under `method`.
pub fn parametric_var(
    losses: &[f64],
    confidence_level: f64,
    method: ParametricMethod,
) -> Result<f64, RiskError> {
    RiskError::check_confidence(confidence_level)?;
    if losses.is_empty() {
        return Err(RiskError::EmptySample);
    }
    let z = normal_inv_cdf(confidence_level);
    let quantile = match method {
        ParametricMethod::Normal => z,
        ParametricMethod::CornishFisher => {
            cornish_fisher_quantile(z, skewness(losses), excess_kurtosis(losses))
        }
    };
    Ok(mean(losses) + std_dev(losses) * quantile)
}

/// Cornish-Fisher adjusted standard normal quantile.
pub fn cornish_fisher_quantile(z: f64, skew: f64, excess_kurtosis: f64) -> f64 {
    let z2 = z * z;
    let z3 = z2 * z;
    z + (z2 - 1.0) * skew / 6.0 + (z3 - 3.0 * z) * excess_kurtosis / 24.0
        - (2.0 * z3 - 5.0 * z) * skew * skew / 36.0
}

fn sorted_losses(losses: &[f64]) -> Result<Vec<f64>, RiskError> {
    if losses.is_empty() {
        return Err(RiskError::EmptySample);
    }
    if losses.iter().any(|x| !x.is_finite()) {
        return Err(RiskError::InvalidInput("losses must be finite".into()));
    }
    let mut sorted = losses.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

fn tail_mean(sorted: &[f64], threshold: f64) -> f64 {
    let start = sorted.partition_point(|x| *x < threshold);
    let tail = &sorted[start..];
    if tail.is_empty() {
        threshold
    } else {
        mean(tail).max(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_type7_quantile() {
        let losses = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_relative_eq!(historical_var(&losses, 0.5).unwrap(), 3.0);
        assert_relative_eq!(historical_var(&losses, 0.9).unwrap(), 4.6, epsilon = 1e-12);
    }

    #[test]
    fn test_cvar_is_tail_mean() {
        let losses: Vec<f64> = (1..=100).map(f64::from).collect();
        // VaR95 = 95.05, tail = 96..=100
        assert_relative_eq!(historical_cvar(&losses, 0.95).unwrap(), 98.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_parametric_matches_closed_form() {
        let losses = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let sigma = 2.5_f64.sqrt();
        let var = parametric_var(&losses, 0.99, ParametricMethod::Normal).unwrap();
        assert_relative_eq!(var, sigma * 2.326_347_874, epsilon = 1e-6);
    }

    #[test]
    fn test_cornish_fisher_reduces_to_normal_without_higher_moments() {
        assert_relative_eq!(cornish_fisher_quantile(1.645, 0.0, 0.0), 1.645);
        // fat tails push the 99% quantile out
        assert!(cornish_fisher_quantile(2.326, 0.0, 3.0) > 2.326);
    }

    #[test]
    fn test_errors() {
        assert_eq!(historical_var(&[], 0.95), Err(RiskError::EmptySample));
        assert!(matches!(
            historical_var(&[1.0], 1.5),
            Err(RiskError::InvalidConfidenceLevel(_))
        ));
        assert!(losses(&[1.0, 2.0], &[1.0]).is_err());
    }

    proptest! {
        #[test]
        fn test_var_monotone_in_confidence(
            sample in prop::collection::vec(-1e6f64..1e6, 2..200),
            p in 0.5f64..0.98,
            dp in 0.001f64..0.019,
        ) {
            let lo = VarEstimate::from_losses(&sample, p).unwrap();
            let hi = VarEstimate::from_losses(&sample, p + dp).unwrap();
            prop_assert!(hi.historical_var >= lo.historical_var - 1e-6);
            prop_assert!(hi.normal_var >= lo.normal_var - 1e-6);
            prop_assert!(lo.cvar >= lo.historical_var);
        }
    }
}
