//! Rebalance triggers.
//!
//! - `Calendar`: every `every_periods` periods
//! - `DriftTriggered`: when any weight strays more than `threshold` from
//!   the last target
//! - `BiasTriggered`: when the last period's move is large enough to
//!   provoke the client, `|r| ≥ threshold·(1 − s_max)` with `s_max` the
//!   client's strongest bias

use serde::{Deserialize, Serialize};
use std::fmt;
use wealth_core::types::BiasProfile;

/// When a client's portfolio is rebalanced.
///
/// # Examples
///
/// ```
/// use wealth_simulation::rebalance::{RebalanceInputs, RebalancePolicy};
/// use wealth_core::types::BiasProfile;
///
/// let policy = RebalancePolicy::DriftTriggered { threshold: 0.05 };
/// let biases = BiasProfile::neutral();
/// let inputs = RebalanceInputs {
///     period: 3,
///     current_weights: &[0.66, 0.34],
///     target_weights: &[0.6, 0.4],
///     last_return: 0.01,
///     biases: &biases,
/// };
/// assert!(policy.decide(&inputs).is_some());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RebalancePolicy {
    /// Fixed schedule
    Calendar {
        /// Periods between rebalances
        every_periods: usize,
    },
    /// Weight drift beyond a tolerance
    DriftTriggered {
        /// Maximum absolute weight deviation tolerated
        threshold: f64,
    },
    /// Client reaction to a large move
    BiasTriggered {
        /// Move that provokes a bias-free client
        threshold: f64,
    },
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        RebalancePolicy::Calendar { every_periods: 1 }
    }
}

/// Observations a trigger is evaluated on.
#[derive(Clone, Copy, Debug)]
pub struct RebalanceInputs<'a> {
    /// Period being closed
    pub period: usize,
    /// Weights after revaluation
    pub current_weights: &'a [f64],
    /// Weights targeted at the last rebalance
    pub target_weights: &'a [f64],
    /// Portfolio return of the period
    pub last_return: f64,
    /// Client biases
    pub biases: &'a BiasProfile,
}

/// Why a rebalance fired.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum RebalanceTrigger {
    /// Scheduled rebalance
    Calendar,
    /// Largest weight deviation observed
    Drift {
        /// `max_i |w_i − target_i|`
        deviation: f64,
    },
    /// Client reacted to the period's return
    Bias {
        /// Return that triggered the reaction
        period_return: f64,
    },
}

impl fmt::Display for RebalanceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceTrigger::Calendar => write!(f, "calendar"),
            RebalanceTrigger::Drift { deviation } => write!(f, "drift {deviation:.4}"),
            RebalanceTrigger::Bias { period_return } => {
                write!(f, "bias reaction to {:.2}%", period_return * 100.0)
            }
        }
    }
}

impl RebalancePolicy {
    /// Returns the trigger if a rebalance should happen.
    pub fn decide(&self, inputs: &RebalanceInputs<'_>) -> Option<RebalanceTrigger> {
        match *self {
            RebalancePolicy::Calendar { every_periods } => {
                (inputs.period % every_periods.max(1) == 0).then_some(RebalanceTrigger::Calendar)
            }
            RebalancePolicy::DriftTriggered { threshold } => {
                let deviation = max_drift(inputs.current_weights, inputs.target_weights);
                (deviation > threshold).then_some(RebalanceTrigger::Drift { deviation })
            }
            RebalancePolicy::BiasTriggered { threshold } => {
                let trigger = threshold * (1.0 - inputs.biases.max_strength());
                (inputs.last_return.abs() >= trigger && inputs.last_return != 0.0).then_some(
                    RebalanceTrigger::Bias {
                        period_return: inputs.last_return,
                    },
                )
            }
        }
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            RebalancePolicy::Calendar { every_periods } if every_periods == 0 => {
                Err("every_periods must be positive".into())
            }
            RebalancePolicy::DriftTriggered { threshold }
            | RebalancePolicy::BiasTriggered { threshold }
                if !(threshold > 0.0) || !threshold.is_finite() =>
            {
                Err("rebalance threshold must be positive".into())
            }
            _ => Ok(()),
        }
    }
}

/// `max_i |w_i − target_i|`.
pub fn max_drift(current: &[f64], target: &[f64]) -> f64 {
    current
        .iter()
        .zip(target)
        .map(|(w, t)| (w - t).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(
        period: usize,
        current: &'a [f64],
        last_return: f64,
        biases: &'a BiasProfile,
    ) -> RebalanceInputs<'a> {
        RebalanceInputs {
            period,
            current_weights: current,
            target_weights: &[0.6, 0.4],
            last_return,
            biases,
        }
    }

    #[test]
    fn test_calendar() {
        let b = BiasProfile::neutral();
        let policy = RebalancePolicy::Calendar { every_periods: 3 };
        assert!(policy.decide(&inputs(3, &[0.6, 0.4], 0.0, &b)).is_some());
        assert!(policy.decide(&inputs(4, &[0.6, 0.4], 0.0, &b)).is_none());
        assert!(RebalancePolicy::default()
            .decide(&inputs(7, &[0.6, 0.4], 0.0, &b))
            .is_some());
    }

    #[test]
    fn test_drift() {
        let b = BiasProfile::neutral();
        let policy = RebalancePolicy::DriftTriggered { threshold: 0.05 };
        assert!(policy.decide(&inputs(1, &[0.63, 0.37], 0.0, &b)).is_none());
        match policy.decide(&inputs(1, &[0.7, 0.3], 0.0, &b)) {
            Some(RebalanceTrigger::Drift { deviation }) => assert!((deviation - 0.1).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bias_trigger_scales_with_strength() {
        let policy = RebalancePolicy::BiasTriggered { threshold: 0.10 };
        let calm = BiasProfile::neutral();
        let nervous = BiasProfile {
            loss_aversion_strength: 0.8,
            ..BiasProfile::neutral()
        };
        // -4% does not move a bias-free client but does move a nervous one
        assert!(policy.decide(&inputs(1, &[0.6, 0.4], -0.04, &calm)).is_none());
        assert!(policy.decide(&inputs(1, &[0.6, 0.4], -0.04, &nervous)).is_some());
    }

    #[test]
    fn test_validation() {
        assert!(RebalancePolicy::Calendar { every_periods: 0 }.validate().is_err());
        assert!(RebalancePolicy::DriftTriggered { threshold: 0.0 }.validate().is_err());
        assert!(RebalancePolicy::default().validate().is_ok());
    }
}
