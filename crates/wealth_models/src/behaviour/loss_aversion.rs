//! Loss aversion: reluctance to sell risky assets after a drawdown.

use super::{BiasContext, BiasPolicy};

/// Damps de-risking trades after recent cumulative losses.
///
/// The policy fires only when the cumulative portfolio return over the
/// lookback window is below `-threshold` and the proposed weights reduce
/// risky exposure. It then moves only part of the way from the current to
/// the proposed weights, with damping `d = strength · (1 − 1/coefficient)`.
#[derive(Clone, Debug, PartialEq)]
pub struct LossAversion {
    /// Bias strength in [0, 1]
    pub strength: f64,
    /// Prospect-theory loss aversion coefficient (≥ 1)
    pub coefficient: f64,
    /// Cumulative loss that triggers the policy
    pub threshold: f64,
}

impl LossAversion {
    /// Fraction of the trade that is suppressed.
    #[inline]
    pub fn damping(&self) -> f64 {
        self.strength * (1.0 - 1.0 / self.coefficient.max(1.0))
    }
}

fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

fn risky_exposure(weights: &[f64], risky: &[bool]) -> f64 {
    weights
        .iter()
        .zip(risky)
        .filter(|(_, r)| **r)
        .map(|(w, _)| *w)
        .sum()
}

impl BiasPolicy for LossAversion {
    fn name(&self) -> &'static str {
        "loss_aversion"
    }

    fn is_active(&self) -> bool {
        self.damping() > 0.0
    }

    fn adjust_weights(&self, proposed: &[f64], ctx: &BiasContext<'_>) -> Vec<f64> {
        if cumulative_return(ctx.recent_portfolio_returns) >= -self.threshold {
            return proposed.to_vec();
        }
        let current = ctx.current_weights;
        if risky_exposure(proposed, ctx.risky) >= risky_exposure(current, ctx.risky) {
            return proposed.to_vec();
        }
        let d = self.damping();
        current
            .iter()
            .zip(proposed)
            .map(|(c, p)| c + (1.0 - d) * (p - c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ctx<'a>(returns: &'a [f64]) -> BiasContext<'a> {
        BiasContext {
            current_weights: &[0.8, 0.2],
            anchor_weights: &[0.5, 0.5],
            consensus_weights: &[0.5, 0.5],
            risky: &[true, false],
            recent_portfolio_returns: returns,
            periods_elapsed: 4,
        }
    }

    fn policy() -> LossAversion {
        LossAversion {
            strength: 1.0,
            coefficient: 2.0,
            threshold: 0.05,
        }
    }

    #[test]
    fn test_damps_de_risking_after_losses() {
        let adjusted = policy().adjust_weights(&[0.4, 0.6], &ctx(&[-0.04, -0.04]));
        // d = 0.5: half of the 0.4 sale is suppressed
        assert_relative_eq!(adjusted[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(adjusted[1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_ignores_small_losses() {
        let adjusted = policy().adjust_weights(&[0.4, 0.6], &ctx(&[-0.01, -0.02]));
        assert_eq!(adjusted, vec![0.4, 0.6]);
    }

    #[test]
    fn test_ignores_risk_increasing_trades() {
        let adjusted = policy().adjust_weights(&[0.9, 0.1], &ctx(&[-0.1]));
        assert_eq!(adjusted, vec![0.9, 0.1]);
    }

    #[test]
    fn test_unit_coefficient_is_inactive() {
        let p = LossAversion {
            strength: 1.0,
            coefficient: 1.0,
            threshold: 0.0,
        };
        assert!(!p.is_active());
    }
}
