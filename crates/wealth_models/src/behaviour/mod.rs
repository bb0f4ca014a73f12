//! Behavioural bias policies.
//!
//! This module provides `BiasPolicyKind` for static dispatch over the four
//! client biases and the [`BiasInjector`] that applies them.
//!
//! ## Design
//!
//! - **Deterministic**: policies are pure functions of the client profile,
//!   the proposed weights and the recent return history
//! - **Fixed order**: loss aversion → herding → anchoring on weights;
//!   recency acts on the expected returns handed to the optimiser
//! - **Static dispatch**: all policy dispatch via `match` expressions
//!
//! ## Example
//!
//! ```
//! use wealth_models::behaviour::{BiasContext, BiasPolicy, BiasPolicyKind, Herding};
//!
//! let policy = BiasPolicyKind::Herding(Herding { strength: 0.5 });
//! let ctx = BiasContext {
//!     current_weights: &[0.5, 0.5],
//!     anchor_weights: &[0.5, 0.5],
//!     consensus_weights: &[1.0, 0.0],
//!     risky: &[true, false],
//!     recent_portfolio_returns: &[],
//!     periods_elapsed: 0,
//! };
//! let adjusted = policy.adjust_weights(&[0.0, 1.0], &ctx);
//! assert_eq!(adjusted, vec![0.5, 0.5]);
//! ```

mod anchoring;
mod herding;
mod injector;
mod loss_aversion;
mod recency;

pub use anchoring::Anchoring;
pub use herding::Herding;
pub use injector::{BiasInjector, BiasToggles};
pub use loss_aversion::LossAversion;
pub use recency::Recency;

/// Market and portfolio information visible to the weight policies.
#[derive(Clone, Copy, Debug)]
pub struct BiasContext<'a> {
    /// Weights held before the rebalance
    pub current_weights: &'a [f64],
    /// Onboarding allocation the client anchors on
    pub anchor_weights: &'a [f64],
    /// Allocation held by the client's peer group
    pub consensus_weights: &'a [f64],
    /// Whether each asset counts as risky (Equity, Alternative, Esg)
    pub risky: &'a [bool],
    /// Portfolio returns over the lookback window, oldest first
    pub recent_portfolio_returns: &'a [f64],
    /// Periods since onboarding
    pub periods_elapsed: usize,
}

/// Behaviour shared by all bias policies.
pub trait BiasPolicy {
    /// Policy name.
    fn name(&self) -> &'static str;

    /// Whether the policy has any effect.
    fn is_active(&self) -> bool;

    /// Adjusts proposed target weights. Default: unchanged.
    fn adjust_weights(&self, proposed: &[f64], _ctx: &BiasContext<'_>) -> Vec<f64> {
        proposed.to_vec()
    }

    /// Adjusts the expected returns fed to the optimiser. Default: unchanged.
    ///
    /// `recent_asset_returns` holds one per-asset return vector per period,
    /// oldest first.
    fn adjust_expected_returns(
        &self,
        expected: &[f64],
        _recent_asset_returns: &[Vec<f64>],
    ) -> Vec<f64> {
        expected.to_vec()
    }
}

/// Static dispatch enum over the bias policies.
#[derive(Clone, Debug, PartialEq)]
pub enum BiasPolicyKind {
    /// Resistance to de-risking after losses
    LossAversion(LossAversion),
    /// Pull towards the consensus allocation
    Herding(Herding),
    /// Pull towards the onboarding allocation
    Anchoring(Anchoring),
    /// Over-weighting of recent returns in expectations
    Recency(Recency),
}

impl BiasPolicy for BiasPolicyKind {
    fn name(&self) -> &'static str {
        match self {
            BiasPolicyKind::LossAversion(p) => p.name(),
            BiasPolicyKind::Herding(p) => p.name(),
            BiasPolicyKind::Anchoring(p) => p.name(),
            BiasPolicyKind::Recency(p) => p.name(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            BiasPolicyKind::LossAversion(p) => p.is_active(),
            BiasPolicyKind::Herding(p) => p.is_active(),
            BiasPolicyKind::Anchoring(p) => p.is_active(),
            BiasPolicyKind::Recency(p) => p.is_active(),
        }
    }

    fn adjust_weights(&self, proposed: &[f64], ctx: &BiasContext<'_>) -> Vec<f64> {
        match self {
            BiasPolicyKind::LossAversion(p) => p.adjust_weights(proposed, ctx),
            BiasPolicyKind::Herding(p) => p.adjust_weights(proposed, ctx),
            BiasPolicyKind::Anchoring(p) => p.adjust_weights(proposed, ctx),
            BiasPolicyKind::Recency(p) => p.adjust_weights(proposed, ctx),
        }
    }

    fn adjust_expected_returns(
        &self,
        expected: &[f64],
        recent_asset_returns: &[Vec<f64>],
    ) -> Vec<f64> {
        match self {
            BiasPolicyKind::LossAversion(p) => {
                p.adjust_expected_returns(expected, recent_asset_returns)
            }
            BiasPolicyKind::Herding(p) => p.adjust_expected_returns(expected, recent_asset_returns),
            BiasPolicyKind::Anchoring(p) => {
                p.adjust_expected_returns(expected, recent_asset_returns)
            }
            BiasPolicyKind::Recency(p) => p.adjust_expected_returns(expected, recent_asset_returns),
        }
    }
}

/// Clamps weights at zero and rescales them to sum to one.
///
/// Returns the input unchanged if nothing positive remains.
pub fn renormalise(weights: &[f64]) -> Vec<f64> {
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return weights.to_vec();
    }
    clamped.into_iter().map(|w| w / total).collect()
}

/// Blends `from` towards `to` by `t`.
pub(crate) fn blend(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter()
        .zip(to)
        .map(|(a, b)| (1.0 - t) * a + t * b)
        .collect()
}
