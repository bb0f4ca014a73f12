//! Trading costs.
//!
//! Trading a monetary value `v` in an asset with average daily traded value
//! `ADV` and annual volatility `σ` costs:
//!
//! ```text
//! spread = |v|·(half_spread + spread_slope·|v|/ADV)
//! impact = |v|·η·(σ/√252)·√(|v|/ADV)
//! fee    = |v|·fee_rate
//! ```
//!
//! Spread and impact both grow with trade size relative to ADV.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wealth_core::types::{Asset, AssetClass};

const TRADING_DAYS: f64 = 252.0;

/// Cost breakdown of one trade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeCost {
    /// Bid-ask spread paid
    pub spread: f64,
    /// Market impact paid
    pub impact: f64,
    /// Flat transaction fee
    pub fee: f64,
}

impl TradeCost {
    /// Sum of all components.
    #[inline]
    pub fn total(&self) -> f64 {
        self.spread + self.impact + self.fee
    }
}

impl std::ops::AddAssign for TradeCost {
    fn add_assign(&mut self, rhs: Self) {
        self.spread += rhs.spread;
        self.impact += rhs.impact;
        self.fee += rhs.fee;
    }
}

/// Spread, square-root impact and flat fee model.
///
/// # Examples
///
/// ```
/// use wealth_core::types::{Asset, AssetClass};
/// use wealth_simulation::costs::CostModel;
///
/// let equity = Asset::new("EQ", AssetClass::Equity, 0.08, 0.15);
/// let model = CostModel::default();
///
/// let small = model.cost(&equity, 10_000.0).total() / 10_000.0;
/// let large = model.cost(&equity, 10_000_000.0).total() / 10_000_000.0;
/// assert!(large > small);
/// assert_eq!(CostModel::zero().cost(&equity, 1e6).total(), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Per-class half-spread overrides; missing classes use the class default
    pub half_spreads: BTreeMap<AssetClass, f64>,
    /// Additional spread per unit of `|v|/ADV`
    pub spread_slope: f64,
    /// Square-root impact coefficient `η`
    pub impact_coefficient: f64,
    /// Flat fee per unit traded
    pub fee_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            half_spreads: BTreeMap::new(),
            spread_slope: 1e-4,
            impact_coefficient: 0.1,
            fee_rate: 0.001,
        }
    }
}

impl CostModel {
    /// Frictionless trading.
    pub fn zero() -> Self {
        Self {
            half_spreads: AssetClass::ALL.iter().map(|c| (*c, 0.0)).collect(),
            spread_slope: 0.0,
            impact_coefficient: 0.0,
            fee_rate: 0.0,
        }
    }

    /// Half-spread applied to `class`.
    pub fn half_spread(&self, class: AssetClass) -> f64 {
        self.half_spreads
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_half_spread())
    }

    /// Whether every component is zero.
    pub fn is_frictionless(&self) -> bool {
        self.spread_slope == 0.0
            && self.impact_coefficient == 0.0
            && self.fee_rate == 0.0
            && AssetClass::ALL.iter().all(|c| self.half_spread(*c) == 0.0)
    }

    /// Cost of trading `value` (either sign) in `asset`.
    pub fn cost(&self, asset: &Asset, value: f64) -> TradeCost {
        let v = value.abs();
        if v == 0.0 {
            return TradeCost::default();
        }
        let participation = v / asset.average_daily_volume.max(1.0);
        let daily_vol = asset.volatility / TRADING_DAYS.sqrt();
        TradeCost {
            spread: v * (self.half_spread(asset.class) + self.spread_slope * participation),
            impact: v * self.impact_coefficient * daily_vol * participation.sqrt(),
            fee: v * self.fee_rate,
        }
    }

    /// Validates parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("spread_slope", self.spread_slope),
            ("impact_coefficient", self.impact_coefficient),
            ("fee_rate", self.fee_rate),
        ];
        for (name, value) in rates {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(format!("{name} must be non-negative"));
            }
        }
        if self.fee_rate >= 1.0 {
            return Err("fee_rate must be below 1".to_string());
        }
        for (class, spread) in &self.half_spreads {
            if !(0.0..1.0).contains(spread) {
                return Err(format!("half spread for {class} must lie in [0, 1)"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn equity() -> Asset {
        Asset::new("EQ", AssetClass::Equity, 0.08, 0.16).with_average_daily_volume(1_000_000.0)
    }

    #[test]
    fn test_cost_components() {
        let model = CostModel::default();
        let cost = model.cost(&equity(), 10_000.0);
        // participation 1%
        assert_relative_eq!(cost.spread, 10_000.0 * (0.0005 + 1e-4 * 0.01), epsilon = 1e-9);
        assert_relative_eq!(
            cost.impact,
            10_000.0 * 0.1 * (0.16 / 252f64.sqrt()) * 0.1,
            epsilon = 1e-9
        );
        assert_relative_eq!(cost.fee, 10.0, epsilon = 1e-12);
        assert_relative_eq!(cost.total(), cost.spread + cost.impact + cost.fee);
    }

    #[test]
    fn test_sells_cost_the_same_as_buys() {
        let model = CostModel::default();
        assert_eq!(model.cost(&equity(), -5_000.0), model.cost(&equity(), 5_000.0));
    }

    #[test]
    fn test_cost_fraction_increases_with_size() {
        let model = CostModel::default();
        let mut last = 0.0;
        for v in [1e3, 1e4, 1e5, 1e6, 1e7] {
            let fraction = model.cost(&equity(), v).total() / v;
            assert!(fraction > last);
            last = fraction;
        }
    }

    #[test]
    fn test_half_spread_override() {
        let mut model = CostModel::default();
        assert_eq!(model.half_spread(AssetClass::Alternative), 0.005);
        model.half_spreads.insert(AssetClass::Alternative, 0.01);
        assert_eq!(model.half_spread(AssetClass::Alternative), 0.01);
    }

    #[test]
    fn test_zero_model() {
        let model = CostModel::zero();
        assert!(model.is_frictionless());
        assert!(!CostModel::default().is_frictionless());
    }

    #[test]
    fn test_validation() {
        assert!(CostModel::default().validate().is_ok());
        let bad = CostModel {
            fee_rate: -0.1,
            ..CostModel::default()
        };
        assert!(bad.validate().is_err());
    }
}
