//! Return and risk-adjusted performance of a single path.
//!
//! Ratios are annualised from per-period returns:
//!
//! - Sharpe: `(r̄ − r_f/ppy)·√ppy / σ`
//! - Sortino: `(r̄ − r_f/ppy)·√ppy / DD`, with `DD` the downside deviation
//!   below the per-period risk-free rate
//!
//! A ratio with a zero denominator is undefined and reported as `None`.

use serde::{Deserialize, Serialize};
use wealth_core::math::statistics::{downside_deviation, mean, std_dev};

/// Performance metrics of one path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPerformance {
    /// Compounded return over the path
    pub total_return: f64,
    /// Geometric annualised return
    pub annualised_return: f64,
    /// Annualised volatility of period returns
    pub annualised_volatility: f64,
    /// Annualised Sharpe ratio
    pub sharpe_ratio: Option<f64>,
    /// Annualised Sortino ratio
    pub sortino_ratio: Option<f64>,
}

impl PathPerformance {
    /// Computes metrics from per-period simple returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use wealth_risk::performance::PathPerformance;
    ///
    /// let perf = PathPerformance::from_returns(&[0.01; 12], 12, 0.0);
    /// assert!((perf.total_return - (1.01_f64.powi(12) - 1.0)).abs() < 1e-12);
    ///
    /// let flat = PathPerformance::from_returns(&[0.0; 12], 12, 0.0);
    /// assert_eq!(flat.annualised_volatility, 0.0);
    /// assert_eq!(flat.sharpe_ratio, None);
    /// ```
    pub fn from_returns(returns: &[f64], periods_per_year: usize, risk_free_rate: f64) -> Self {
        let ppy = periods_per_year.max(1) as f64;
        let total_return = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        let annualised_return = if returns.is_empty() || total_return <= -1.0 {
            total_return
        } else {
            (1.0 + total_return).powf(ppy / returns.len() as f64) - 1.0
        };

        let rf = risk_free_rate / ppy;
        let excess = mean(returns) - rf;
        let sigma = std_dev(returns);
        let downside = downside_deviation(returns, rf);
        let ratio = |denominator: f64| {
            (denominator > 0.0 && denominator.is_finite()).then(|| excess * ppy.sqrt() / denominator)
        };

        Self {
            total_return,
            annualised_return,
            annualised_volatility: sigma * ppy.sqrt(),
            sharpe_ratio: ratio(sigma),
            sortino_ratio: ratio(downside),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_annualisation() {
        let perf = PathPerformance::from_returns(&[0.02, -0.01, 0.03, 0.0], 4, 0.0);
        let total = 1.02 * 0.99 * 1.03 - 1.0;
        assert_relative_eq!(perf.total_return, total, epsilon = 1e-12);
        // four quarters make a year
        assert_relative_eq!(perf.annualised_return, total, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_and_sortino() {
        let returns = [0.02, -0.01, 0.03, -0.02];
        let perf = PathPerformance::from_returns(&returns, 12, 0.0);
        let m = 0.005;
        let sd = std_dev(&returns);
        assert_relative_eq!(perf.sharpe_ratio.unwrap(), m * 12f64.sqrt() / sd, epsilon = 1e-12);
        let dd = ((0.01f64.powi(2) + 0.02f64.powi(2)) / 4.0).sqrt();
        assert_relative_eq!(perf.sortino_ratio.unwrap(), m * 12f64.sqrt() / dd, epsilon = 1e-12);
    }

    #[test]
    fn test_no_downside_leaves_sortino_undefined() {
        let perf = PathPerformance::from_returns(&[0.01, 0.02], 12, 0.0);
        assert!(perf.sharpe_ratio.is_some());
        assert_eq!(perf.sortino_ratio, None);
    }
}
