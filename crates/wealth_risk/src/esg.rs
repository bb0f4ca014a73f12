//! Portfolio ESG scoring.
//!
//! The portfolio score is the value-weighted mean of asset scores over the
//! holdings that carry one; unscored assets and cash are left out of the
//! weighting.

use serde::{Deserialize, Serialize};
use std::fmt;
use wealth_core::types::Universe;
use wealth_simulation::state::PortfolioState;

/// Letter rating for a 0–100 ESG score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EsgRating {
    /// Below 40
    B,
    /// 40 to 50
    BB,
    /// 50 to 60
    BBB,
    /// 60 to 70
    A,
    /// 70 to 80
    AA,
    /// 80 and above
    AAA,
}

impl EsgRating {
    /// Rating bucket of `score`.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::AAA,
            s if s >= 70.0 => Self::AA,
            s if s >= 60.0 => Self::A,
            s if s >= 50.0 => Self::BBB,
            s if s >= 40.0 => Self::BB,
            _ => Self::B,
        }
    }
}

impl fmt::Display for EsgRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::B => "B",
            Self::BB => "BB",
            Self::BBB => "BBB",
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        };
        f.write_str(s)
    }
}

/// Value-weighted ESG score of `state`, or `None` if no scored asset is held.
pub fn portfolio_esg_score(state: &PortfolioState, universe: &Universe) -> Option<f64> {
    let (weighted, total) = universe
        .assets()
        .iter()
        .zip(&state.positions)
        .filter_map(|(asset, p)| asset.esg_score.map(|s| (s, p.market_value())))
        .filter(|(_, v)| *v > 0.0)
        .fold((0.0, 0.0), |(ws, tv), (s, v)| (ws + s * v, tv + v));
    (total > 0.0).then(|| weighted / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use wealth_core::types::{Asset, AssetClass};
    use wealth_simulation::state::InitialPortfolio;

    #[test]
    fn test_unscored_assets_excluded() {
        let universe = Universe::new(vec![
            Asset::new("GREEN", AssetClass::Esg, 0.07, 0.14).with_esg_score(90.0),
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_esg_score(50.0),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
        ])
        .unwrap();
        let state = InitialPortfolio::from_weights(
            1_000.0,
            [("GREEN", 0.25), ("EQ", 0.25), ("BOND", 0.5)],
        )
        .to_state(&universe, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 5.0)
        .unwrap();
        let score = portfolio_esg_score(&state, &universe).unwrap();
        assert_relative_eq!(score, 70.0, epsilon = 1e-12);
        assert_eq!(EsgRating::from_score(score), EsgRating::AA);
    }

    #[test]
    fn test_ratings() {
        assert_eq!(EsgRating::from_score(85.0).to_string(), "AAA");
        assert_eq!(EsgRating::from_score(39.9), EsgRating::B);
        assert!(EsgRating::AAA > EsgRating::BBB);
    }
}
