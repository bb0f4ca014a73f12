//! Simulated paths and per-client outcomes.

use crate::error::ScenarioFailure;
use crate::state::{PortfolioState, StateEvent};
use serde::{Deserialize, Serialize};
use wealth_core::math::statistics::ewma_volatility;
use wealth_core::types::ClientId;

/// RiskMetrics decay for volatility forecasts.
pub const EWMA_LAMBDA: f64 = 0.94;

/// Ordered portfolio states of one client under one scenario.
///
/// `states[0]` is the initial portfolio; `states[t]` the end of period `t`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationPath {
    /// Client simulated
    pub client_id: ClientId,
    /// Scenario index
    pub scenario: usize,
    /// Periods per year of the run
    pub periods_per_year: usize,
    /// Snapshots from period 0
    pub states: Vec<PortfolioState>,
}

impl SimulationPath {
    /// Number of simulated periods.
    #[inline]
    pub fn num_periods(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    /// Portfolio value at period 0.
    pub fn initial_value(&self) -> f64 {
        self.states.first().map_or(0.0, PortfolioState::total_value)
    }

    /// Portfolio value at the last period.
    pub fn final_value(&self) -> f64 {
        self.states.last().map_or(0.0, PortfolioState::total_value)
    }

    /// Last snapshot.
    pub fn final_state(&self) -> Option<&PortfolioState> {
        self.states.last()
    }

    /// Portfolio value at `period`, if simulated.
    pub fn value_at(&self, period: usize) -> Option<f64> {
        self.states.get(period).map(PortfolioState::total_value)
    }

    /// Portfolio values from period 0.
    pub fn values(&self) -> Vec<f64> {
        self.states.iter().map(PortfolioState::total_value).collect()
    }

    /// Per-period returns (excluding period 0).
    pub fn period_returns(&self) -> Vec<f64> {
        self.states.iter().skip(1).map(|s| s.period_return).collect()
    }

    /// Whether any period needed a forced liquidation.
    pub fn had_liquidity_shortfall(&self) -> bool {
        self.states.iter().any(|s| s.liquidity_shortfall)
    }

    /// Number of optimiser fallbacks along the path.
    pub fn fallback_count(&self) -> usize {
        self.events()
            .filter(|e| matches!(e, StateEvent::OptimiserFallback { .. }))
            .count()
    }

    /// Every event along the path in order.
    pub fn events(&self) -> impl Iterator<Item = &StateEvent> {
        self.states.iter().flat_map(|s| s.events.iter())
    }

    /// Annualised EWMA volatility forecast from the path's returns.
    pub fn volatility_forecast(&self) -> f64 {
        let returns = self.period_returns();
        if returns.is_empty() {
            return 0.0;
        }
        ewma_volatility(&returns, EWMA_LAMBDA) * (self.periods_per_year as f64).sqrt()
    }
}

/// All paths simulated for one client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Client simulated
    pub client_id: ClientId,
    /// Client position in the batch (enters seed derivation)
    pub client_index: usize,
    /// Portfolio value at period 0
    pub initial_value: f64,
    /// Successful paths ordered by scenario index
    pub paths: Vec<SimulationPath>,
    /// Scenarios excluded and why
    pub failures: Vec<ScenarioFailure>,
}

impl SimulationOutcome {
    /// Scenarios requested.
    #[inline]
    pub fn requested(&self) -> usize {
        self.paths.len() + self.failures.len()
    }

    /// Terminal values of the successful paths.
    pub fn final_values(&self) -> Vec<f64> {
        self.paths.iter().map(SimulationPath::final_value).collect()
    }

    /// Fraction of paths with a forced liquidation.
    pub fn shortfall_frequency(&self) -> f64 {
        if self.paths.is_empty() {
            return 0.0;
        }
        let hits = self
            .paths
            .iter()
            .filter(|p| p.had_liquidity_shortfall())
            .count();
        hits as f64 / self.paths.len() as f64
    }
}
