//! Factor stress scenarios.
//!
//! A scenario is an instantaneous shock to named factor returns. Each asset
//! moves by its loading-weighted sum of the shocks; factors the model does
//! not carry are ignored. A scenario may also mark down assets that cannot
//! trade daily, modelling a forced exit from gated or locked vehicles.

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use wealth_core::types::Universe;
use wealth_models::factor::FactorModel;
use wealth_simulation::state::PortfolioState;

/// Floor on a stressed asset return.
const RETURN_FLOOR: f64 = -1.0;

/// Preset stress scenarios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressPreset {
    /// Equity crash
    EquityCrash,
    /// Rate shock
    RateShock,
    /// Stagflation
    Stagflation,
    /// Liquidity crisis
    LiquidityCrisis,
}

impl StressPreset {
    /// Every preset.
    pub const ALL: [StressPreset; 4] = [
        StressPreset::EquityCrash,
        StressPreset::RateShock,
        StressPreset::Stagflation,
        StressPreset::LiquidityCrisis,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EquityCrash => "Equity crash",
            Self::RateShock => "Rate shock",
            Self::Stagflation => "Stagflation",
            Self::LiquidityCrisis => "Liquidity crisis",
        }
    }

    /// Description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::EquityCrash => "Equity factor -30%, credit -10%",
            Self::RateShock => "Rates factor -10% (about +200bp on a 5-year duration)",
            Self::Stagflation => "Equity -15%, rates -8%, credit -5%",
            Self::LiquidityCrisis => {
                "Equity -20%, credit -15%, gated and locked assets marked down 15%"
            }
        }
    }

    /// Scenario definition.
    pub fn scenario(&self) -> StressScenario {
        let s = StressScenario::new(self.name());
        match self {
            Self::EquityCrash => s.with_shock("equity", -0.30).with_shock("credit", -0.10),
            Self::RateShock => s.with_shock("rates", -0.10),
            Self::Stagflation => s
                .with_shock("equity", -0.15)
                .with_shock("rates", -0.08)
                .with_shock("credit", -0.05),
            Self::LiquidityCrisis => s
                .with_shock("equity", -0.20)
                .with_shock("credit", -0.15)
                .with_illiquid_haircut(0.15),
        }
    }
}

/// Instantaneous shock to named factors.
///
/// # Examples
///
/// ```
/// use wealth_risk::stress::StressScenario;
///
/// let scenario = StressScenario::new("Tech selloff").with_shock("equity", -0.25);
/// assert_eq!(scenario.factor_shocks["equity"], -0.25);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Scenario name
    pub name: String,
    /// Factor return shocks keyed by factor name (case-insensitive)
    pub factor_shocks: BTreeMap<String, f64>,
    /// Extra markdown on assets that are not daily-liquid
    #[serde(default)]
    pub illiquid_haircut: f64,
}

impl StressScenario {
    /// Scenario with no shocks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factor_shocks: BTreeMap::new(),
            illiquid_haircut: 0.0,
        }
    }

    /// Adds a factor shock.
    pub fn with_shock(mut self, factor: impl Into<String>, shock: f64) -> Self {
        self.factor_shocks.insert(factor.into(), shock);
        self
    }

    /// Sets the markdown on gated and locked assets.
    pub fn with_illiquid_haircut(mut self, haircut: f64) -> Self {
        self.illiquid_haircut = haircut;
        self
    }

    /// Stressed return of every asset in universe order.
    ///
    /// # Errors
    ///
    /// - `RiskError::DimensionMismatch` if the model and universe disagree
    /// - `RiskError::NoMatchingFactor` if the scenario moves nothing
    /// - `RiskError::InvalidInput` for a haircut outside [0, 1]
    pub fn asset_shocks(
        &self,
        factors: &FactorModel,
        universe: &Universe,
    ) -> Result<Vec<f64>, RiskError> {
        if factors.n_assets() != universe.len() {
            return Err(RiskError::DimensionMismatch {
                context: "factor loadings vs universe",
                expected: universe.len(),
                found: factors.n_assets(),
            });
        }
        if !(0.0..=1.0).contains(&self.illiquid_haircut) {
            return Err(RiskError::InvalidInput(format!(
                "illiquid haircut {} must lie in [0, 1]",
                self.illiquid_haircut
            )));
        }

        let mut shocks = vec![0.0; factors.n_factors()];
        let mut matched = 0;
        for (name, shock) in &self.factor_shocks {
            match factors
                .factor_names()
                .iter()
                .position(|f| f.eq_ignore_ascii_case(name))
            {
                Some(k) => {
                    shocks[k] += shock;
                    matched += 1;
                }
                None => debug!(scenario = %self.name, factor = %name, "Factor not in model"),
            }
        }
        if matched == 0 && self.illiquid_haircut == 0.0 {
            return Err(RiskError::NoMatchingFactor(self.name.clone()));
        }

        let loadings = factors.loadings();
        Ok(universe
            .assets()
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let systematic: f64 = loadings
                    .row(i)
                    .iter()
                    .zip(&shocks)
                    .map(|(b, f)| b * f)
                    .sum();
                let r = systematic.max(RETURN_FLOOR);
                if asset.liquidity.is_daily() {
                    r
                } else {
                    (1.0 + r) * (1.0 - self.illiquid_haircut) - 1.0
                }
            })
            .collect())
    }
}

/// Loss of `state`'s holdings under `asset_shocks` (positive = loss).
///
/// Cash is unaffected.
pub fn stress_loss(state: &PortfolioState, asset_shocks: &[f64]) -> f64 {
    -state
        .positions
        .iter()
        .zip(asset_shocks)
        .map(|(p, s)| p.market_value() * s)
        .sum::<f64>()
}

/// Stress outcome across paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    /// Scenario name
    pub scenario: String,
    /// Mean loss over the paths' ending portfolios
    pub mean_loss: f64,
    /// Largest loss over the paths' ending portfolios
    pub worst_loss: f64,
    /// Mean loss as a fraction of ending value
    pub mean_loss_fraction: f64,
}
