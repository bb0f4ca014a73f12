//! JSON batch input: market data and client records.
//!
//! ```json
//! {
//!   "market": {
//!     "assets": [
//!       {"id": "EQ", "class": "equity", "expected_return": 0.08,
//!        "volatility": 0.15, "exposures": [1.0, 0.0]}
//!     ],
//!     "factor_names": ["equity", "rates"],
//!     "factor_covariance": [[0.0225, 0.00075], [0.00075, 0.0025]],
//!     "regimes": "three_state"
//!   },
//!   "clients": [
//!     {"profile": {"id": "C1", "segment": "hnw", "wealth": 1000000.0,
//!                  "risk_tolerance": 6.0},
//!      "portfolio": {"holdings": {"EQ": 1000000.0}}}
//!   ]
//! }
//! ```

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use wealth_core::math::Matrix;
use wealth_core::types::{ClientProfile, Universe};
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::sampler::{ReturnModel, TailModel};
use wealth_simulation::state::InitialPortfolio;

/// Regime chain used for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeChoice {
    /// Single calm regime
    Calm,
    /// Bull, bear and crisis
    #[default]
    ThreeState,
}

impl RegimeChoice {
    fn build(self) -> RegimeSwitching {
        match self {
            RegimeChoice::Calm => RegimeSwitching::calm(),
            RegimeChoice::ThreeState => RegimeSwitching::default_three_state(),
        }
    }
}

/// Asset universe and factor model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Asset records
    pub assets: Vec<wealth_core::types::Asset>,
    /// Factor names, matching each asset's exposure order
    pub factor_names: Vec<String>,
    /// Annual factor covariance, row-major
    pub factor_covariance: Vec<Vec<f64>>,
    /// Non-PSD covariance handling
    #[serde(default)]
    pub psd_policy: PsdPolicy,
    /// Regime chain
    #[serde(default)]
    pub regimes: RegimeChoice,
    /// Innovation distribution
    #[serde(default)]
    pub tail: TailModel,
}

impl MarketData {
    /// Builds the return model at `periods_per_year`.
    pub fn build_model(&self, periods_per_year: usize) -> Result<Arc<ReturnModel>> {
        let universe = Arc::new(Universe::new(self.assets.clone())?);
        let covariance = Matrix::from_rows(self.factor_covariance.clone())?;
        let factors = FactorModel::from_universe(
            &universe,
            self.factor_names.clone(),
            covariance,
            self.psd_policy,
        )?;
        let model = ReturnModel::new(universe, factors, self.regimes.build(), periods_per_year)?
            .with_tail_model(self.tail)?;
        Ok(Arc::new(model))
    }
}

/// One client and their holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Client profile
    pub profile: ClientProfile,
    /// Starting portfolio
    pub portfolio: InitialPortfolio,
}

/// A complete batch input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInput {
    /// Market data
    pub market: MarketData,
    /// Clients in batch order
    pub clients: Vec<ClientRecord>,
}

impl BatchInput {
    /// Parses a JSON document.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CliError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads a JSON batch file.
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(CliError::FileNotFound(display));
        }
        let text = std::fs::read_to_string(path).map_err(|e| CliError::io(&display, e))?;
        let batch = Self::from_json_str(&text, &display)?;
        if batch.clients.is_empty() {
            return Err(CliError::InvalidArgument(format!("{display} has no clients")));
        }
        info!(
            assets = batch.market.assets.len(),
            clients = batch.clients.len(),
            "Loaded batch input"
        );
        Ok(batch)
    }

    /// Client and portfolio pairs in batch order.
    pub fn client_pairs(&self) -> Vec<(ClientProfile, InitialPortfolio)> {
        self.clients
            .iter()
            .map(|c| (c.profile.clone(), c.portfolio.clone()))
            .collect()
    }
}
