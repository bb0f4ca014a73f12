//! Herding: drift towards what peers hold.

use super::{blend, BiasContext, BiasPolicy};

/// Blends proposed weights towards the consensus allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Herding {
    /// Bias strength in [0, 1]
    pub strength: f64,
}

impl BiasPolicy for Herding {
    fn name(&self) -> &'static str {
        "herding"
    }

    fn is_active(&self) -> bool {
        self.strength > 0.0
    }

    fn adjust_weights(&self, proposed: &[f64], ctx: &BiasContext<'_>) -> Vec<f64> {
        if ctx.consensus_weights.len() != proposed.len() {
            return proposed.to_vec();
        }
        blend(proposed, ctx.consensus_weights, self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_herding_copies_consensus() {
        let ctx = BiasContext {
            current_weights: &[0.5, 0.5],
            anchor_weights: &[0.5, 0.5],
            consensus_weights: &[0.7, 0.3],
            risky: &[true, false],
            recent_portfolio_returns: &[],
            periods_elapsed: 0,
        };
        let adjusted = Herding { strength: 1.0 }.adjust_weights(&[0.2, 0.8], &ctx);
        assert_relative_eq!(adjusted[0], 0.7, epsilon = 1e-15);
        let partial = Herding { strength: 0.25 }.adjust_weights(&[0.2, 0.8], &ctx);
        assert_relative_eq!(partial[0], 0.325, epsilon = 1e-15);
    }
}
