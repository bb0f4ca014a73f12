//! Simulation configuration.
//!
//! [`SimulationConfig`] is built with a validating builder or deserialised
//! from TOML; every field has a default. Validation runs before any
//! simulation work, so a bad configuration never produces partial output.

use crate::costs::CostModel;
use crate::error::ConfigurationError;
use crate::fees::FeeSchedule;
use crate::liquidity::LiquidityPolicy;
use crate::rebalance::RebalancePolicy;
use crate::tax::TaxPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wealth_core::types::AssetId;
use wealth_models::behaviour::BiasToggles;
use wealth_optimiser::constraints::ConstraintSet;
use wealth_optimiser::strategy::{StrategyKind, StrategySelector};

/// Maximum number of scenarios per client.
pub const MAX_SCENARIOS: usize = 1_000_000;

/// Maximum number of periods per path.
pub const MAX_PERIODS: usize = 1_200;

/// Maximum number of clients per batch.
pub const MAX_CLIENTS: usize = 100_000;

/// Supported period lengths.
pub const SUPPORTED_PERIODS_PER_YEAR: [usize; 6] = [1, 2, 4, 12, 52, 252];

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

/// Parameters of a simulation run.
///
/// # Examples
///
/// ```rust
/// use wealth_simulation::config::SimulationConfig;
/// use wealth_simulation::rebalance::RebalancePolicy;
///
/// let config = SimulationConfig::builder()
///     .num_scenarios(500)
///     .num_periods(24)
///     .rebalance(RebalancePolicy::DriftTriggered { threshold: 0.05 })
///     .random_seed(7)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.num_scenarios, 500);
/// assert_eq!(config.confidence_levels, vec![0.95, 0.99]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Largest number of clients taken from a batch; every client when unset
    pub num_clients: Option<usize>,
    /// Periods per path
    pub num_periods: usize,
    /// Scenarios per client
    pub num_scenarios: usize,
    /// Periods per year (12 for monthly)
    pub periods_per_year: usize,
    /// Rebalance trigger
    pub rebalance: RebalancePolicy,
    /// Optimiser strategy selection
    pub strategy: StrategySelector,
    /// Optimiser constraints
    pub constraints: ConstraintSet,
    /// VaR/CVaR confidence levels
    pub confidence_levels: Vec<f64>,
    /// Base seed of every scenario RNG
    pub random_seed: u64,
    /// Trading cost model
    pub costs: CostModel,
    /// Management and performance fees
    pub fees: FeeSchedule,
    /// Capital-gains tax
    pub tax: TaxPolicy,
    /// Cash buffer and forced-sale terms
    pub liquidity: LiquidityPolicy,
    /// Annual return on cash balances
    pub cash_rate: f64,
    /// Behavioural policy switches
    pub biases: BiasToggles,
    /// Valuation date of period 0
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Periods of history visible to loss aversion
    pub lookback_periods: usize,
    /// Peer-group allocation used by herding; tolerance-5 onboarding mix when unset
    pub consensus_allocation: Option<BTreeMap<AssetId, f64>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_clients: None,
            num_periods: 12,
            num_scenarios: 1_000,
            periods_per_year: 12,
            rebalance: RebalancePolicy::default(),
            strategy: StrategySelector::default(),
            constraints: ConstraintSet::default(),
            confidence_levels: vec![0.95, 0.99],
            random_seed: 42,
            costs: CostModel::default(),
            fees: FeeSchedule::default(),
            tax: TaxPolicy::default(),
            liquidity: LiquidityPolicy::default(),
            cash_rate: 0.0,
            biases: BiasToggles::default(),
            start_date: default_start_date(),
            lookback_periods: 12,
            consensus_allocation: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a builder starting from the defaults.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigurationError` found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(n) = self.num_clients {
            if n == 0 || n > MAX_CLIENTS {
                return Err(ConfigurationError::InvalidClientCount(n));
            }
        }
        if self.num_periods == 0 || self.num_periods > MAX_PERIODS {
            return Err(ConfigurationError::InvalidPeriodCount(self.num_periods));
        }
        if self.num_scenarios == 0 || self.num_scenarios > MAX_SCENARIOS {
            return Err(ConfigurationError::InvalidScenarioCount(self.num_scenarios));
        }
        if !SUPPORTED_PERIODS_PER_YEAR.contains(&self.periods_per_year) {
            return Err(ConfigurationError::InvalidPeriodsPerYear(self.periods_per_year));
        }
        if self.confidence_levels.is_empty() {
            return Err(ConfigurationError::invalid(
                "confidence_levels",
                "at least one level is required",
            ));
        }
        if let Some(&level) = self
            .confidence_levels
            .iter()
            .find(|c| !(**c > 0.0 && **c < 1.0))
        {
            return Err(ConfigurationError::InvalidConfidenceLevel(level));
        }
        self.rebalance
            .validate()
            .map_err(|reason| ConfigurationError::invalid("rebalance", reason))?;
        self.constraints.validate()?;
        self.costs
            .validate()
            .map_err(|reason| ConfigurationError::invalid("costs", reason))?;
        self.fees
            .validate()
            .map_err(|reason| ConfigurationError::invalid("fees", reason))?;
        self.tax
            .validate()
            .map_err(|reason| ConfigurationError::invalid("tax", reason))?;
        self.liquidity
            .validate()
            .map_err(|reason| ConfigurationError::invalid("liquidity", reason))?;
        if !self.cash_rate.is_finite() || self.cash_rate <= -1.0 {
            return Err(ConfigurationError::invalid(
                "cash_rate",
                "must be finite and above -100%",
            ));
        }
        if let Some(consensus) = &self.consensus_allocation {
            let total: f64 = consensus.values().sum();
            if consensus.values().any(|w| !(*w >= 0.0)) || (total - 1.0).abs() > 1e-6 {
                return Err(ConfigurationError::invalid(
                    "consensus_allocation",
                    "weights must be non-negative and sum to 1",
                ));
            }
        }
        Ok(())
    }

    /// Months between valuation dates, when periods are whole months.
    pub fn months_per_period(&self) -> Option<u32> {
        (12 % self.periods_per_year == 0).then(|| (12 / self.periods_per_year) as u32)
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Caps the number of clients taken from a batch.
    #[inline]
    pub fn num_clients(mut self, n: usize) -> Self {
        self.config.num_clients = Some(n);
        self
    }

    /// Sets the number of periods per path.
    #[inline]
    pub fn num_periods(mut self, n: usize) -> Self {
        self.config.num_periods = n;
        self
    }

    /// Sets the number of scenarios per client.
    #[inline]
    pub fn num_scenarios(mut self, n: usize) -> Self {
        self.config.num_scenarios = n;
        self
    }

    /// Sets the number of periods per year.
    #[inline]
    pub fn periods_per_year(mut self, n: usize) -> Self {
        self.config.periods_per_year = n;
        self
    }

    /// Sets the rebalance trigger.
    #[inline]
    pub fn rebalance(mut self, policy: RebalancePolicy) -> Self {
        self.config.rebalance = policy;
        self
    }

    /// Uses `strategy` for every client.
    #[inline]
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = StrategySelector::new(strategy);
        self
    }

    /// Sets the strategy selector.
    #[inline]
    pub fn strategy_selector(mut self, selector: StrategySelector) -> Self {
        self.config.strategy = selector;
        self
    }

    /// Sets the optimiser constraints.
    #[inline]
    pub fn constraints(mut self, constraints: ConstraintSet) -> Self {
        self.config.constraints = constraints;
        self
    }

    /// Sets the VaR confidence levels.
    #[inline]
    pub fn confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.config.confidence_levels = levels;
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Sets the trading cost model.
    #[inline]
    pub fn costs(mut self, costs: CostModel) -> Self {
        self.config.costs = costs;
        self
    }

    /// Sets the fee schedule.
    #[inline]
    pub fn fees(mut self, fees: FeeSchedule) -> Self {
        self.config.fees = fees;
        self
    }

    /// Sets the tax policy.
    #[inline]
    pub fn tax(mut self, tax: TaxPolicy) -> Self {
        self.config.tax = tax;
        self
    }

    /// Sets the liquidity policy.
    #[inline]
    pub fn liquidity(mut self, liquidity: LiquidityPolicy) -> Self {
        self.config.liquidity = liquidity;
        self
    }

    /// Disables costs, fees and tax.
    pub fn frictionless(mut self) -> Self {
        self.config.costs = CostModel::zero();
        self.config.fees = FeeSchedule::none();
        self.config.tax = TaxPolicy::exempt();
        self
    }

    /// Sets the annual return on cash.
    #[inline]
    pub fn cash_rate(mut self, rate: f64) -> Self {
        self.config.cash_rate = rate;
        self
    }

    /// Sets the behavioural policy switches.
    #[inline]
    pub fn biases(mut self, toggles: BiasToggles) -> Self {
        self.config.biases = toggles;
        self
    }

    /// Sets the valuation date of period 0.
    #[inline]
    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.config.start_date = date;
        self
    }

    /// Sets the loss-aversion lookback.
    #[inline]
    pub fn lookback_periods(mut self, n: usize) -> Self {
        self.config.lookback_periods = n;
        self
    }

    /// Sets the peer-group allocation used by herding.
    pub fn consensus_allocation(mut self, allocation: BTreeMap<AssetId, f64>) -> Self {
        self.config.consensus_allocation = Some(allocation);
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if any parameter is out of range.
    pub fn build(self) -> Result<SimulationConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
