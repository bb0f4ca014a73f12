//! Applies a client's biases to optimiser inputs and outputs.

use super::{
    renormalise, Anchoring, BiasContext, BiasPolicy, BiasPolicyKind, Herding, LossAversion,
    Recency,
};
use serde::{Deserialize, Serialize};
use wealth_core::types::client::MAX_RISK_TOLERANCE;
use wealth_core::types::ClientProfile;

/// Run-level switches for each bias policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasToggles {
    /// Enable loss aversion
    pub loss_aversion: bool,
    /// Enable herding
    pub herding: bool,
    /// Enable anchoring
    pub anchoring: bool,
    /// Enable recency
    pub recency: bool,
    /// Enable profile adaptation after each period
    pub adaptation: bool,
}

impl Default for BiasToggles {
    fn default() -> Self {
        Self {
            loss_aversion: true,
            herding: true,
            anchoring: true,
            recency: true,
            adaptation: true,
        }
    }
}

impl BiasToggles {
    /// Every policy disabled.
    pub fn none() -> Self {
        Self {
            loss_aversion: false,
            herding: false,
            anchoring: false,
            recency: false,
            adaptation: false,
        }
    }
}

/// Deterministic bias injector.
///
/// # Examples
///
/// ```
/// use wealth_core::types::ClientProfile;
/// use wealth_models::behaviour::{BiasContext, BiasInjector};
///
/// let injector = BiasInjector::new(12);
/// let client = ClientProfile::new("C1", 1_000_000.0, 5.0);
/// let ctx = BiasContext {
///     current_weights: &[0.5, 0.5],
///     anchor_weights: &[0.5, 0.5],
///     consensus_weights: &[0.6, 0.4],
///     risky: &[true, false],
///     recent_portfolio_returns: &[-0.2],
///     periods_elapsed: 3,
/// };
///
/// // A client without biases gets the proposal back untouched
/// assert_eq!(injector.apply_bias(&client, &[0.7, 0.3], &ctx), vec![0.7, 0.3]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BiasInjector {
    toggles: BiasToggles,
    periods_per_year: usize,
}

impl BiasInjector {
    /// Creates an injector with every policy enabled.
    pub fn new(periods_per_year: usize) -> Self {
        Self {
            toggles: BiasToggles::default(),
            periods_per_year,
        }
    }

    /// Overrides the policy switches.
    pub fn with_toggles(mut self, toggles: BiasToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Active policy switches.
    #[inline]
    pub fn toggles(&self) -> BiasToggles {
        self.toggles
    }

    /// Weight policies for `client` in application order.
    ///
    /// Disabled and zero-strength policies are omitted.
    pub fn weight_policies(&self, client: &ClientProfile) -> Vec<BiasPolicyKind> {
        let b = &client.biases;
        let mut policies = Vec::with_capacity(3);
        if self.toggles.loss_aversion {
            policies.push(BiasPolicyKind::LossAversion(LossAversion {
                strength: b.loss_aversion_strength,
                coefficient: b.loss_aversion_coefficient,
                threshold: b.loss_threshold,
            }));
        }
        if self.toggles.herding {
            policies.push(BiasPolicyKind::Herding(Herding {
                strength: b.herding_strength,
            }));
        }
        if self.toggles.anchoring {
            policies.push(BiasPolicyKind::Anchoring(Anchoring {
                weight: b.anchoring_weight,
                decay: b.anchoring_decay,
            }));
        }
        policies.retain(|p| p.is_active());
        policies
    }

    /// Applies loss aversion, herding and anchoring to `proposed`.
    ///
    /// Each step's output is clamped at zero and renormalised. A client
    /// with no active policy gets `proposed` back unchanged.
    pub fn apply_bias(
        &self,
        client: &ClientProfile,
        proposed: &[f64],
        ctx: &BiasContext<'_>,
    ) -> Vec<f64> {
        let policies = self.weight_policies(client);
        if policies.is_empty() {
            return proposed.to_vec();
        }
        policies.iter().fold(proposed.to_vec(), |weights, policy| {
            renormalise(&policy.adjust_weights(&weights, ctx))
        })
    }

    /// Subjective expected returns under recency bias.
    pub fn subjective_returns(
        &self,
        client: &ClientProfile,
        expected: &[f64],
        recent_asset_returns: &[Vec<f64>],
    ) -> Vec<f64> {
        let recency = Recency {
            strength: client.biases.recency_strength,
            window: client.biases.recency_window,
            periods_per_year: self.periods_per_year,
        };
        if !self.toggles.recency || !recency.is_active() {
            return expected.to_vec();
        }
        BiasPolicyKind::Recency(recency).adjust_expected_returns(expected, recent_asset_returns)
    }

    /// Profile after experiencing `period_return`.
    ///
    /// Losses lower risk tolerance and raise loss-aversion strength, gains
    /// do the reverse, scaled by the client's adaptation rate:
    /// `rt' = clamp(rt + a·10·r, 0, 10)`, `s' = clamp(s − a·r, 0, 1)`.
    pub fn update_profile(&self, client: &ClientProfile, period_return: f64) -> ClientProfile {
        let a = client.biases.adaptation_rate;
        if !self.toggles.adaptation || a == 0.0 || !period_return.is_finite() {
            return client.clone();
        }
        let mut next = client.clone();
        next.risk_tolerance = (client.risk_tolerance + a * MAX_RISK_TOLERANCE * period_return)
            .clamp(0.0, MAX_RISK_TOLERANCE);
        next.biases.loss_aversion_strength =
            (client.biases.loss_aversion_strength - a * period_return).clamp(0.0, 1.0);
        next
    }
}
