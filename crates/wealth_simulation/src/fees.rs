//! Management and performance fees.
//!
//! The management fee is tiered on a marginal basis: each slice of assets
//! under management pays the rate of the tier it falls in. It is quoted
//! annually and charged every period pro rata.
//!
//! The performance fee is charged at year end on gains above the
//! high-water mark, grown by the hurdle rate when one is set.

use serde::{Deserialize, Serialize};

/// One tier of the management fee schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    /// AUM from which this tier's rate applies
    pub threshold: f64,
    /// Annual rate applied to AUM above `threshold`
    pub rate: f64,
}

/// Fee schedule of a mandate.
///
/// # Examples
///
/// ```
/// use wealth_simulation::fees::FeeSchedule;
///
/// let fees = FeeSchedule::default();
/// // 1% on the first 5M, 0.75% on the next 20M
/// let annual = fees.annual_management_fee(10_000_000.0);
/// assert!((annual - (50_000.0 + 37_500.0)).abs() < 1e-6);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Management fee tiers in ascending threshold order, the first at zero
    pub management_tiers: Vec<FeeTier>,
    /// Share of gains above the hurdle-adjusted high-water mark
    pub performance_rate: f64,
    /// Annual hurdle the high-water mark grows by before a performance fee is due
    pub hurdle_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            management_tiers: vec![
                FeeTier {
                    threshold: 0.0,
                    rate: 0.01,
                },
                FeeTier {
                    threshold: 5_000_000.0,
                    rate: 0.0075,
                },
                FeeTier {
                    threshold: 25_000_000.0,
                    rate: 0.005,
                },
            ],
            performance_rate: 0.0,
            hurdle_rate: 0.0,
        }
    }
}

impl FeeSchedule {
    /// No fees at all.
    pub fn none() -> Self {
        Self {
            management_tiers: Vec::new(),
            performance_rate: 0.0,
            hurdle_rate: 0.0,
        }
    }

    /// Adds a hedge-fund style performance fee.
    pub fn with_performance_fee(mut self, rate: f64, hurdle: f64) -> Self {
        self.performance_rate = rate;
        self.hurdle_rate = hurdle;
        self
    }

    /// Annual management fee on `aum` under the marginal tier schedule.
    pub fn annual_management_fee(&self, aum: f64) -> f64 {
        if aum <= 0.0 {
            return 0.0;
        }
        let mut fee = 0.0;
        for (i, tier) in self.management_tiers.iter().enumerate() {
            if aum <= tier.threshold {
                break;
            }
            let ceiling = self
                .management_tiers
                .get(i + 1)
                .map_or(f64::INFINITY, |next| next.threshold);
            fee += (aum.min(ceiling) - tier.threshold) * tier.rate;
        }
        fee
    }

    /// Management fee for one period.
    #[inline]
    pub fn period_management_fee(&self, aum: f64, periods_per_year: usize) -> f64 {
        self.annual_management_fee(aum) / periods_per_year.max(1) as f64
    }

    /// Performance fee due at year end and the high-water mark afterwards.
    ///
    /// Gains are measured above the hurdle mark `hwm·(1 + hurdle)`; the
    /// hurdle is validated non-negative, so that mark never sits below the
    /// high-water mark. The new high-water mark is the post-fee value when
    /// that is higher.
    pub fn performance_fee(&self, value: f64, high_water_mark: f64) -> (f64, f64) {
        if self.performance_rate <= 0.0 {
            return (0.0, high_water_mark.max(value));
        }
        let hurdle_mark = high_water_mark * (1.0 + self.hurdle_rate);
        let fee = self.performance_rate * (value - hurdle_mark).max(0.0);
        (fee, high_water_mark.max(value - fee))
    }

    /// Validates tiers and rates.
    pub fn validate(&self) -> Result<(), String> {
        let mut previous = f64::NEG_INFINITY;
        for tier in &self.management_tiers {
            if !(tier.threshold >= 0.0) || tier.threshold <= previous {
                return Err("management tiers must have strictly ascending, non-negative thresholds".into());
            }
            if !(0.0..1.0).contains(&tier.rate) {
                return Err(format!("management rate {} must lie in [0, 1)", tier.rate));
            }
            previous = tier.threshold;
        }
        if !(0.0..1.0).contains(&self.performance_rate) {
            return Err("performance_rate must lie in [0, 1)".into());
        }
        if !(self.hurdle_rate >= 0.0) {
            return Err("hurdle_rate must be non-negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tiers_are_marginal() {
        let fees = FeeSchedule::default();
        assert_relative_eq!(fees.annual_management_fee(1_000_000.0), 10_000.0);
        assert_relative_eq!(fees.annual_management_fee(5_000_000.0), 50_000.0);
        assert_relative_eq!(
            fees.annual_management_fee(30_000_000.0),
            50_000.0 + 150_000.0 + 25_000.0
        );
        assert_eq!(fees.annual_management_fee(0.0), 0.0);
    }

    #[test]
    fn test_period_fee() {
        let fees = FeeSchedule::default();
        assert_relative_eq!(fees.period_management_fee(1_200_000.0, 12), 1_000.0);
    }

    #[test]
    fn test_performance_fee_above_high_water_mark() {
        let fees = FeeSchedule::none().with_performance_fee(0.2, 0.0);
        let (fee, hwm) = fees.performance_fee(1_100_000.0, 1_000_000.0);
        assert_relative_eq!(fee, 20_000.0);
        assert_relative_eq!(hwm, 1_080_000.0);

        // below the mark: no fee, mark unchanged
        let (fee, hwm) = fees.performance_fee(900_000.0, 1_000_000.0);
        assert_eq!(fee, 0.0);
        assert_eq!(hwm, 1_000_000.0);
    }

    #[test]
    fn test_performance_fee_with_hurdle() {
        let fees = FeeSchedule::none().with_performance_fee(0.2, 0.05);
        let (fee, _) = fees.performance_fee(1_040_000.0, 1_000_000.0);
        assert_eq!(fee, 0.0);
        let (fee, _) = fees.performance_fee(1_100_000.0, 1_000_000.0);
        assert_relative_eq!(fee, 0.2 * 50_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_validation() {
        assert!(FeeSchedule::default().validate().is_ok());
        let mut bad = FeeSchedule::default();
        bad.management_tiers.swap(0, 1);
        assert!(bad.validate().is_err());

        let negative_hurdle = FeeSchedule::none().with_performance_fee(0.2, -0.05);
        assert!(negative_hurdle.validate().is_err());
    }

    #[test]
    fn test_hurdle_mark_grows_from_high_water_mark() {
        let fees = FeeSchedule::none().with_performance_fee(0.1, 0.08);
        let (fee, hwm) = fees.performance_fee(1_200_000.0, 1_000_000.0);
        assert_relative_eq!(fee, 0.1 * 120_000.0, epsilon = 1e-6);
        assert_relative_eq!(hwm, 1_188_000.0, epsilon = 1e-6);
    }
}
