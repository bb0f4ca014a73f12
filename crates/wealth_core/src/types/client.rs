//! Client profiles, behavioural bias parameters and financial goals.

use super::asset::{AssetClass, Universe};
use super::error::DataError;
use super::ids::{AssetId, ClientId, GoalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound of the risk tolerance scale.
pub const MAX_RISK_TOLERANCE: f64 = 10.0;

/// Client wealth segment.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WealthSegment {
    /// Ultra-high-net-worth (investable wealth of 30M and above)
    Uhnw,
    /// High-net-worth (1M to 30M)
    Hnw,
    /// Mass affluent (100k to 1M)
    MassAffluent,
    /// Emerging affluent (below 100k)
    EmergingAffluent,
}

impl WealthSegment {
    /// Classifies investable wealth into a segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use wealth_core::types::WealthSegment;
    ///
    /// assert_eq!(WealthSegment::from_wealth(2_500_000.0), WealthSegment::Hnw);
    /// assert_eq!(WealthSegment::from_wealth(50_000.0), WealthSegment::EmergingAffluent);
    /// ```
    pub fn from_wealth(wealth: f64) -> Self {
        if wealth >= 30_000_000.0 {
            WealthSegment::Uhnw
        } else if wealth >= 1_000_000.0 {
            WealthSegment::Hnw
        } else if wealth >= 100_000.0 {
            WealthSegment::MassAffluent
        } else {
            WealthSegment::EmergingAffluent
        }
    }

    /// Human-readable segment name.
    pub fn name(&self) -> &'static str {
        match self {
            WealthSegment::Uhnw => "UHNW",
            WealthSegment::Hnw => "HNW",
            WealthSegment::MassAffluent => "Mass Affluent",
            WealthSegment::EmergingAffluent => "Emerging Affluent",
        }
    }
}

fn default_loss_aversion_coefficient() -> f64 {
    2.25
}

fn default_loss_threshold() -> f64 {
    0.05
}

fn default_anchoring_decay() -> f64 {
    0.9
}

fn default_recency_window() -> usize {
    3
}

/// Behavioural bias parameters of a client.
///
/// Every strength lies in [0, 1]; a strength of zero disables the
/// corresponding policy for this client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiasProfile {
    /// How strongly the client resists de-risking after losses
    #[serde(default)]
    pub loss_aversion_strength: f64,
    /// Prospect-theory loss aversion coefficient (losses weigh λ times gains)
    #[serde(default = "default_loss_aversion_coefficient")]
    pub loss_aversion_coefficient: f64,
    /// Cumulative recent loss that activates loss aversion
    #[serde(default = "default_loss_threshold")]
    pub loss_threshold: f64,
    /// Pull towards the consensus allocation
    #[serde(default)]
    pub herding_strength: f64,
    /// Initial pull towards the onboarding allocation
    #[serde(default)]
    pub anchoring_weight: f64,
    /// Per-period decay of the anchoring pull
    #[serde(default = "default_anchoring_decay")]
    pub anchoring_decay: f64,
    /// Weight of recent realised returns in subjective expectations
    #[serde(default)]
    pub recency_strength: f64,
    /// Number of recent periods used by recency bias
    #[serde(default = "default_recency_window")]
    pub recency_window: usize,
    /// Rate at which outcomes reshape risk tolerance and loss aversion
    #[serde(default)]
    pub adaptation_rate: f64,
}

impl Default for BiasProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

impl BiasProfile {
    /// A profile with every bias disabled.
    pub fn neutral() -> Self {
        Self {
            loss_aversion_strength: 0.0,
            loss_aversion_coefficient: default_loss_aversion_coefficient(),
            loss_threshold: default_loss_threshold(),
            herding_strength: 0.0,
            anchoring_weight: 0.0,
            anchoring_decay: default_anchoring_decay(),
            recency_strength: 0.0,
            recency_window: default_recency_window(),
            adaptation_rate: 0.0,
        }
    }

    /// Largest of the four bias strengths.
    pub fn max_strength(&self) -> f64 {
        self.loss_aversion_strength
            .max(self.herding_strength)
            .max(self.anchoring_weight)
            .max(self.recency_strength)
    }

    /// Whether every bias strength is zero.
    pub fn is_neutral(&self) -> bool {
        self.max_strength() == 0.0
    }

    /// Validates ranges; `id` is used in the error message.
    pub fn validate(&self, id: &str) -> Result<(), DataError> {
        let strengths = [
            ("loss_aversion_strength", self.loss_aversion_strength),
            ("herding_strength", self.herding_strength),
            ("anchoring_weight", self.anchoring_weight),
            ("recency_strength", self.recency_strength),
            ("adaptation_rate", self.adaptation_rate),
        ];
        for (name, value) in strengths {
            if !(0.0..=1.0).contains(&value) {
                return Err(DataError::invalid_client(
                    id,
                    format!("{name} must lie in [0, 1], got {value}"),
                ));
            }
        }
        if !(self.loss_aversion_coefficient >= 1.0) {
            return Err(DataError::invalid_client(
                id,
                "loss_aversion_coefficient must be at least 1",
            ));
        }
        if !(self.loss_threshold >= 0.0) {
            return Err(DataError::invalid_client(
                id,
                "loss_threshold must be non-negative",
            ));
        }
        if !(self.anchoring_decay > 0.0 && self.anchoring_decay <= 1.0) {
            return Err(DataError::invalid_client(
                id,
                "anchoring_decay must lie in (0, 1]",
            ));
        }
        if self.recency_window == 0 {
            return Err(DataError::invalid_client(
                id,
                "recency_window must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A financial goal of the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Goal identifier
    pub id: GoalId,
    /// Target portfolio value
    pub target_amount: f64,
    /// Number of periods until the goal falls due
    pub horizon_periods: usize,
    /// Priority (1 is highest)
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    1
}

impl Goal {
    /// Creates a goal with priority 1.
    pub fn new(id: impl Into<GoalId>, target_amount: f64, horizon_periods: usize) -> Self {
        Self {
            id: id.into(),
            target_amount,
            horizon_periods,
            priority: 1,
        }
    }
}

/// Client description consumed by the optimiser, bias injector and simulator.
///
/// A profile is never mutated in place. When outcomes reshape a client's
/// tolerance or biases, a new profile value is produced.
///
/// # Examples
///
/// ```
/// use wealth_core::types::{ClientProfile, WealthSegment};
///
/// let client = ClientProfile::new("C001", 1_000_000.0, 5.0);
/// assert_eq!(client.segment, WealthSegment::Hnw);
/// assert!(client.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Client identifier
    pub id: ClientId,
    /// Wealth segment
    pub segment: WealthSegment,
    /// Investable wealth at onboarding
    pub wealth: f64,
    /// Risk tolerance on a 0 (averse) to 10 (seeking) scale
    pub risk_tolerance: f64,
    /// Behavioural biases
    #[serde(default)]
    pub biases: BiasProfile,
    /// Financial goals
    #[serde(default)]
    pub goals: Vec<Goal>,
    /// Onboarding allocation used as the anchoring reference
    #[serde(default)]
    pub anchor_allocation: Option<BTreeMap<AssetId, f64>>,
}

impl ClientProfile {
    /// Creates a bias-free client with segment derived from wealth.
    pub fn new(id: impl Into<ClientId>, wealth: f64, risk_tolerance: f64) -> Self {
        Self {
            id: id.into(),
            segment: WealthSegment::from_wealth(wealth),
            wealth,
            risk_tolerance,
            biases: BiasProfile::neutral(),
            goals: Vec::new(),
            anchor_allocation: None,
        }
    }

    /// Replaces the bias profile.
    pub fn with_biases(mut self, biases: BiasProfile) -> Self {
        self.biases = biases;
        self
    }

    /// Adds a goal.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goals.push(goal);
        self
    }

    /// Sets the onboarding allocation.
    pub fn with_anchor_allocation(mut self, allocation: BTreeMap<AssetId, f64>) -> Self {
        self.anchor_allocation = Some(allocation);
        self
    }

    /// Mean-variance risk aversion implied by the tolerance scale.
    ///
    /// Maps tolerance 10 to λ = 1 and tolerance 0 to λ = 10.
    #[inline]
    pub fn risk_aversion(&self) -> f64 {
        let rt = self.risk_tolerance.clamp(0.0, MAX_RISK_TOLERANCE);
        1.0 + 9.0 * (1.0 - rt / MAX_RISK_TOLERANCE)
    }

    /// Anchoring reference weights aligned with `universe`.
    ///
    /// Falls back to [`initial_allocation`] when no onboarding allocation
    /// was recorded.
    pub fn anchor_weights(&self, universe: &Universe) -> Result<Vec<f64>, DataError> {
        match &self.anchor_allocation {
            Some(alloc) => universe.dense_weights(alloc.iter()),
            None => Ok(initial_allocation(self.risk_tolerance, universe)),
        }
    }

    /// Validates the profile.
    pub fn validate(&self) -> Result<(), DataError> {
        let id = self.id.as_str();
        if !(self.wealth >= 0.0) {
            return Err(DataError::invalid_client(id, "wealth must be non-negative"));
        }
        if !(0.0..=MAX_RISK_TOLERANCE).contains(&self.risk_tolerance) {
            return Err(DataError::invalid_client(
                id,
                format!(
                    "risk tolerance must lie in [0, 10], got {}",
                    self.risk_tolerance
                ),
            ));
        }
        self.biases.validate(id)?;
        for goal in &self.goals {
            if !(goal.target_amount > 0.0) {
                return Err(DataError::invalid_client(
                    id,
                    format!("goal '{}' must have a positive target", goal.id),
                ));
            }
        }
        Ok(())
    }
}

/// Tolerance-driven onboarding allocation.
///
/// The growth bucket (equity and ESG) receives `min(0.2 + 0.06·rt, 0.9)`,
/// the defensive bucket (fixed income and cash) `max(0.7 − 0.05·rt, 0.05)`,
/// and alternatives the remainder. Empty buckets hand their share to the
/// populated ones pro rata; weights are spread equally inside a bucket.
///
/// # Examples
///
/// ```
/// use wealth_core::types::{initial_allocation, Asset, AssetClass, Universe};
///
/// let universe = Universe::new(vec![
///     Asset::new("EQ", AssetClass::Equity, 0.08, 0.15),
///     Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
///     Asset::new("PE", AssetClass::Alternative, 0.12, 0.25),
/// ])
/// .unwrap();
///
/// let w = initial_allocation(5.0, &universe);
/// assert!((w[0] - 0.5).abs() < 1e-12);
/// assert!((w[1] - 0.45).abs() < 1e-12);
/// assert!((w[2] - 0.05).abs() < 1e-12);
/// ```
pub fn initial_allocation(risk_tolerance: f64, universe: &Universe) -> Vec<f64> {
    let rt = risk_tolerance.clamp(0.0, MAX_RISK_TOLERANCE);
    let growth = (0.2 + 0.06 * rt).min(0.9);
    let defensive = (0.7 - 0.05 * rt).max(0.05);
    let alternative = (1.0 - growth - defensive).max(0.0);

    let bucket = |class: AssetClass| match class {
        AssetClass::Equity | AssetClass::Esg => 0,
        AssetClass::FixedIncome | AssetClass::Cash => 1,
        AssetClass::Alternative => 2,
    };
    let shares = [growth, defensive, alternative];
    let mut counts = [0usize; 3];
    for asset in universe.assets() {
        counts[bucket(asset.class)] += 1;
    }
    let populated: f64 = (0..3).filter(|b| counts[*b] > 0).map(|b| shares[b]).sum();

    universe
        .assets()
        .iter()
        .map(|asset| {
            let b = bucket(asset.class);
            if populated <= 0.0 {
                1.0 / universe.len() as f64
            } else {
                shares[b] / populated / counts[b] as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::asset::Asset;
    use approx::assert_relative_eq;

    fn universe() -> Universe {
        Universe::new(vec![
            Asset::new("EQ1", AssetClass::Equity, 0.08, 0.15),
            Asset::new("EQ2", AssetClass::Esg, 0.07, 0.14),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
        ])
        .unwrap()
    }

    #[test]
    fn test_segment_thresholds() {
        assert_eq!(WealthSegment::from_wealth(30_000_000.0), WealthSegment::Uhnw);
        assert_eq!(WealthSegment::from_wealth(999_999.0), WealthSegment::MassAffluent);
    }

    #[test]
    fn test_risk_aversion_mapping() {
        let mut client = ClientProfile::new("C", 1e6, 10.0);
        assert_relative_eq!(client.risk_aversion(), 1.0);
        client.risk_tolerance = 0.0;
        assert_relative_eq!(client.risk_aversion(), 10.0);
    }

    #[test]
    fn test_initial_allocation_redistributes_empty_bucket() {
        // no alternatives: growth 0.5 and defensive 0.45 are rescaled to sum to one
        let w = initial_allocation(5.0, &universe());
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[0], 0.5 / 0.95 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.45 / 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_allocation_caps() {
        let w = initial_allocation(10.0, &universe());
        // growth 0.2 + 0.6, defensive 0.7 - 0.5
        assert_relative_eq!(w[0] + w[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_validation() {
        let mut biases = BiasProfile::neutral();
        assert!(biases.validate("C").is_ok());
        biases.herding_strength = 1.5;
        assert!(biases.validate("C").is_err());

        let mut biases = BiasProfile::neutral();
        biases.loss_aversion_coefficient = 0.5;
        assert!(biases.validate("C").is_err());
    }

    #[test]
    fn test_client_validation_rejects_bad_tolerance() {
        let client = ClientProfile::new("C", 1e6, 11.0);
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_anchor_weights_fallback_and_explicit() {
        let u = universe();
        let client = ClientProfile::new("C", 1e6, 5.0);
        let fallback = client.anchor_weights(&u).unwrap();
        assert_relative_eq!(fallback.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let mut alloc = BTreeMap::new();
        alloc.insert(AssetId::new("BOND"), 1.0);
        let client = client.with_anchor_allocation(alloc);
        assert_eq!(client.anchor_weights(&u).unwrap(), vec![0.0, 0.0, 1.0]);
    }
}
