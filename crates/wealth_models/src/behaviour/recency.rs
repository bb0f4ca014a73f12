//! Recency: extrapolating the latest returns.

use super::BiasPolicy;

/// Tilts expected returns towards the annualised mean of the last
/// `window` realised asset returns:
/// `μ_subj = (1 − ρ)·μ + ρ·ppy·mean(last N)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Recency {
    /// Bias strength in [0, 1]
    pub strength: f64,
    /// Number of recent periods considered
    pub window: usize,
    /// Periods per year, used to annualise the recent mean
    pub periods_per_year: usize,
}

impl BiasPolicy for Recency {
    fn name(&self) -> &'static str {
        "recency"
    }

    fn is_active(&self) -> bool {
        self.strength > 0.0 && self.window > 0
    }

    fn adjust_expected_returns(
        &self,
        expected: &[f64],
        recent_asset_returns: &[Vec<f64>],
    ) -> Vec<f64> {
        let start = recent_asset_returns.len().saturating_sub(self.window);
        let window = &recent_asset_returns[start..];
        if window.is_empty() {
            return expected.to_vec();
        }
        let ppy = self.periods_per_year as f64;
        expected
            .iter()
            .enumerate()
            .map(|(i, mu)| {
                let recent = window
                    .iter()
                    .map(|period| period.get(i).copied().unwrap_or(0.0))
                    .sum::<f64>()
                    / window.len() as f64;
                (1.0 - self.strength) * mu + self.strength * ppy * recent
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uses_last_window_only() {
        let r = Recency {
            strength: 0.5,
            window: 2,
            periods_per_year: 12,
        };
        let history = vec![vec![-0.5, 0.0], vec![0.02, 0.0], vec![0.04, 0.01]];
        let subjective = r.adjust_expected_returns(&[0.08, 0.03], &history);
        // mean of the last two equity returns is 0.03, i.e. 0.36 annualised
        assert_relative_eq!(subjective[0], 0.5 * 0.08 + 0.5 * 0.36, epsilon = 1e-12);
        assert_relative_eq!(subjective[1], 0.5 * 0.03 + 0.5 * 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_history_is_identity() {
        let r = Recency {
            strength: 0.9,
            window: 3,
            periods_per_year: 12,
        };
        assert_eq!(r.adjust_expected_returns(&[0.05], &[]), vec![0.05]);
    }
}
