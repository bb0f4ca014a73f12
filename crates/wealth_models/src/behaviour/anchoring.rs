//! Anchoring: attachment to the onboarding allocation.

use super::{blend, BiasContext, BiasPolicy};

/// Blends proposed weights towards the anchor with a decaying pull
/// `a_t = weight · decay^t`.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchoring {
    /// Initial pull in [0, 1]
    pub weight: f64,
    /// Per-period decay in (0, 1]
    pub decay: f64,
}

impl Anchoring {
    /// Pull towards the anchor after `periods_elapsed` periods.
    #[inline]
    pub fn pull(&self, periods_elapsed: usize) -> f64 {
        self.weight * self.decay.powf(periods_elapsed as f64)
    }
}

impl BiasPolicy for Anchoring {
    fn name(&self) -> &'static str {
        "anchoring"
    }

    fn is_active(&self) -> bool {
        self.weight > 0.0
    }

    fn adjust_weights(&self, proposed: &[f64], ctx: &BiasContext<'_>) -> Vec<f64> {
        if ctx.anchor_weights.len() != proposed.len() {
            return proposed.to_vec();
        }
        blend(proposed, ctx.anchor_weights, self.pull(ctx.periods_elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pull_decays() {
        let a = Anchoring {
            weight: 0.4,
            decay: 0.5,
        };
        assert_relative_eq!(a.pull(0), 0.4);
        assert_relative_eq!(a.pull(2), 0.1);

        let ctx = BiasContext {
            current_weights: &[0.5, 0.5],
            anchor_weights: &[1.0, 0.0],
            consensus_weights: &[0.5, 0.5],
            risky: &[true, false],
            recent_portfolio_returns: &[],
            periods_elapsed: 2,
        };
        let adjusted = a.adjust_weights(&[0.0, 1.0], &ctx);
        assert_relative_eq!(adjusted[0], 0.1, epsilon = 1e-15);
        assert_relative_eq!(adjusted[1], 0.9, epsilon = 1e-15);
    }
}
