//! Asset descriptions and the asset universe.
//!
//! An [`Asset`] is immutable for the duration of a run. The [`Universe`]
//! owns the ordered asset list; every weight or return vector in the engine
//! is aligned with this order. Layers share a universe through `Arc`.

use super::error::DataError;
use super::ids::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default average daily traded value for assets that do not specify one.
pub const DEFAULT_AVERAGE_DAILY_VOLUME: f64 = 50_000_000.0;

/// Broad asset class.
///
/// Classes drive optimiser bands, default trading spreads, forced-liquidation
/// order and behavioural risk classification.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Listed equities
    Equity,
    /// Government and corporate bonds
    FixedIncome,
    /// Private equity, real estate, hedge funds
    Alternative,
    /// Money-market and deposits
    Cash,
    /// ESG-screened sleeves
    Esg,
}

impl AssetClass {
    /// All asset classes in declaration order.
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Equity,
        AssetClass::FixedIncome,
        AssetClass::Alternative,
        AssetClass::Cash,
        AssetClass::Esg,
    ];

    /// Human-readable class name.
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Equity => "Equity",
            AssetClass::FixedIncome => "Fixed Income",
            AssetClass::Alternative => "Alternative",
            AssetClass::Cash => "Cash",
            AssetClass::Esg => "ESG",
        }
    }

    /// Whether the class counts as risky exposure for behavioural policies.
    #[inline]
    pub fn is_risky(&self) -> bool {
        matches!(
            self,
            AssetClass::Equity | AssetClass::Alternative | AssetClass::Esg
        )
    }

    /// Rank used when raising cash; lower ranks are sold first.
    #[inline]
    pub fn liquidation_rank(&self) -> u8 {
        match self {
            AssetClass::Cash => 0,
            AssetClass::FixedIncome => 1,
            AssetClass::Esg => 2,
            AssetClass::Equity => 3,
            AssetClass::Alternative => 4,
        }
    }

    /// Default half bid-ask spread as a fraction of traded value.
    #[inline]
    pub fn default_half_spread(&self) -> f64 {
        match self {
            AssetClass::Equity => 0.0005,
            AssetClass::FixedIncome => 0.0010,
            AssetClass::Alternative => 0.0050,
            AssetClass::Cash => 0.0,
            AssetClass::Esg => 0.0007,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Redemption terms of an asset.
///
/// # Examples
///
/// ```
/// use wealth_core::types::LiquidityClass;
///
/// let gated = LiquidityClass::QuarterlyGated;
/// assert!(gated.can_trade(3, 12));
/// assert!(!gated.can_trade(4, 12));
///
/// let locked = LiquidityClass::LockUp { vintage: -6, lock_up_periods: 24 };
/// assert!(!locked.can_trade(12, 12));
/// assert!(locked.can_trade(18, 12));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiquidityClass {
    /// Tradable every period
    #[default]
    Daily,
    /// Tradable only at quarter ends
    QuarterlyGated,
    /// Not tradable until the lock-up expires
    LockUp {
        /// Period (relative to simulation start, may be negative) at which capital was committed
        vintage: i32,
        /// Lock-up length in periods
        lock_up_periods: u32,
    },
}

impl LiquidityClass {
    /// Returns `true` for daily-liquid assets.
    #[inline]
    pub fn is_daily(&self) -> bool {
        matches!(self, LiquidityClass::Daily)
    }

    /// Whether the asset may be traded in an ordinary rebalance at `period`.
    pub fn can_trade(&self, period: usize, periods_per_year: usize) -> bool {
        match *self {
            LiquidityClass::Daily => true,
            LiquidityClass::QuarterlyGated => {
                let step = (periods_per_year / 4).max(1);
                period % step == 0
            }
            LiquidityClass::LockUp {
                vintage,
                lock_up_periods,
            } => period as i64 >= vintage as i64 + lock_up_periods as i64,
        }
    }
}

/// Deterministic J-curve profile of a private-market fund.
///
/// Returns an annual excess return that is negative during the drawdown
/// phase, recovers linearly to zero, and then ramps up to `peak` over the
/// remaining fund life.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JCurve {
    /// Annual excess return at inception (negative)
    pub depth: f64,
    /// Years until the drawdown phase ends
    pub recovery_years: f64,
    /// Annual excess return reached at the end of the fund life
    pub peak: f64,
    /// Fund life in years; no adjustment applies afterwards
    pub fund_life_years: f64,
}

impl JCurve {
    /// Private equity buyout profile.
    pub fn private_equity() -> Self {
        Self {
            depth: -0.15,
            recovery_years: 3.0,
            peak: 0.25,
            fund_life_years: 10.0,
        }
    }

    /// Core real estate fund profile.
    pub fn real_estate() -> Self {
        Self {
            depth: -0.05,
            recovery_years: 2.0,
            peak: 0.15,
            fund_life_years: 8.0,
        }
    }

    /// Hedge fund ramp-up profile.
    pub fn hedge_fund() -> Self {
        Self {
            depth: -0.02,
            recovery_years: 1.0,
            peak: 0.12,
            fund_life_years: 5.0,
        }
    }

    /// Annual excess return at fund age `age_years`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wealth_core::types::JCurve;
    ///
    /// let pe = JCurve::private_equity();
    /// assert!((pe.annual_adjustment(0.0) + 0.15).abs() < 1e-12);
    /// assert!(pe.annual_adjustment(3.0).abs() < 1e-12);
    /// assert!(pe.annual_adjustment(9.9) > 0.2);
    /// ```
    pub fn annual_adjustment(&self, age_years: f64) -> f64 {
        if age_years < 0.0 || age_years >= self.fund_life_years {
            return 0.0;
        }
        if age_years < self.recovery_years {
            return self.depth * (1.0 - age_years / self.recovery_years);
        }
        let ramp = self.fund_life_years - self.recovery_years;
        if ramp <= 0.0 {
            return 0.0;
        }
        self.peak * (age_years - self.recovery_years) / ramp
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.recovery_years > 0.0) {
            return Err("J-curve recovery_years must be positive".to_string());
        }
        if self.fund_life_years < self.recovery_years {
            return Err("J-curve fund_life_years must not precede recovery".to_string());
        }
        if self.depth > 0.0 {
            return Err("J-curve depth must be non-positive".to_string());
        }
        Ok(())
    }
}

/// Valuation terms for illiquid private-market assets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateMarketTerms {
    /// Appraisal smoothing weight on the previous reported return, in [0, 1)
    pub smoothing: f64,
    /// Period (relative to simulation start, may be negative) of fund inception
    #[serde(default)]
    pub vintage: i32,
    /// Optional vintage J-curve adjustment
    #[serde(default)]
    pub j_curve: Option<JCurve>,
}

impl PrivateMarketTerms {
    /// Creates smoothing-only terms.
    pub fn smoothed(smoothing: f64) -> Self {
        Self {
            smoothing,
            vintage: 0,
            j_curve: None,
        }
    }

    /// Adds a J-curve with the given vintage.
    pub fn with_j_curve(mut self, j_curve: JCurve, vintage: i32) -> Self {
        self.j_curve = Some(j_curve);
        self.vintage = vintage;
        self
    }

    /// Fund age in years at simulation `period`.
    #[inline]
    pub fn age_years(&self, period: usize, periods_per_year: usize) -> f64 {
        (period as f64 - self.vintage as f64) / periods_per_year.max(1) as f64
    }
}

fn default_adv() -> f64 {
    DEFAULT_AVERAGE_DAILY_VOLUME
}

/// An investable asset.
///
/// # Examples
///
/// ```
/// use wealth_core::types::{Asset, AssetClass};
///
/// let equity = Asset::new("EQ", AssetClass::Equity, 0.08, 0.15)
///     .with_exposures(vec![1.0, 0.0]);
/// assert!(equity.validate().is_ok());
/// assert_eq!(equity.exposures.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier
    pub id: AssetId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Asset class
    pub class: AssetClass,
    /// Expected annual arithmetic return
    pub expected_return: f64,
    /// Annual volatility
    pub volatility: f64,
    /// Loadings on the factor model's factors
    #[serde(default)]
    pub exposures: Vec<f64>,
    /// Redemption terms
    #[serde(default)]
    pub liquidity: LiquidityClass,
    /// External ESG score in [0, 100]
    #[serde(default)]
    pub esg_score: Option<f64>,
    /// Average daily traded value in currency units
    #[serde(default = "default_adv")]
    pub average_daily_volume: f64,
    /// Appraisal and J-curve terms for private-market assets
    #[serde(default)]
    pub private_market: Option<PrivateMarketTerms>,
}

impl Asset {
    /// Creates a daily-liquid asset without factor exposures.
    pub fn new(
        id: impl Into<AssetId>,
        class: AssetClass,
        expected_return: f64,
        volatility: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_string(),
            id,
            class,
            expected_return,
            volatility,
            exposures: Vec::new(),
            liquidity: LiquidityClass::Daily,
            esg_score: None,
            average_daily_volume: DEFAULT_AVERAGE_DAILY_VOLUME,
            private_market: None,
        }
    }

    /// Sets the factor exposures.
    pub fn with_exposures(mut self, exposures: Vec<f64>) -> Self {
        self.exposures = exposures;
        self
    }

    /// Sets the liquidity class.
    pub fn with_liquidity(mut self, liquidity: LiquidityClass) -> Self {
        self.liquidity = liquidity;
        self
    }

    /// Sets the ESG score.
    pub fn with_esg_score(mut self, score: f64) -> Self {
        self.esg_score = Some(score);
        self
    }

    /// Sets the average daily traded value.
    pub fn with_average_daily_volume(mut self, adv: f64) -> Self {
        self.average_daily_volume = adv;
        self
    }

    /// Sets private-market valuation terms.
    pub fn with_private_market(mut self, terms: PrivateMarketTerms) -> Self {
        self.private_market = Some(terms);
        self
    }

    /// Validates the asset record.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidAsset` if:
    /// - expected return or volatility is not finite, or volatility is negative
    /// - any exposure is not finite
    /// - the ESG score is outside [0, 100]
    /// - the average daily volume is not positive
    /// - private-market smoothing is outside [0, 1) or the J-curve is malformed
    pub fn validate(&self) -> Result<(), DataError> {
        let fail = |reason: &str| Err(DataError::invalid_asset(self.id.as_str(), reason));

        if !self.expected_return.is_finite() {
            return fail("expected return must be finite");
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return fail("volatility must be finite and non-negative");
        }
        if self.exposures.iter().any(|x| !x.is_finite()) {
            return fail("factor exposures must be finite");
        }
        if let Some(score) = self.esg_score {
            if !(0.0..=100.0).contains(&score) {
                return fail("ESG score must lie in [0, 100]");
            }
        }
        if !(self.average_daily_volume > 0.0) {
            return fail("average daily volume must be positive");
        }
        if let Some(terms) = &self.private_market {
            if !(0.0..1.0).contains(&terms.smoothing) {
                return fail("appraisal smoothing must lie in [0, 1)");
            }
            if let Some(curve) = &terms.j_curve {
                curve.validate().or_else(|reason| fail(&reason))?;
            }
        }
        Ok(())
    }
}

/// Ordered, validated collection of assets.
///
/// # Examples
///
/// ```
/// use wealth_core::types::{Asset, AssetClass, AssetId, Universe};
///
/// let universe = Universe::new(vec![
///     Asset::new("EQ", AssetClass::Equity, 0.08, 0.15),
///     Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
/// ])
/// .unwrap();
///
/// assert_eq!(universe.len(), 2);
/// assert_eq!(universe.position(&AssetId::new("BOND")), Some(1));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Universe {
    assets: Vec<Asset>,
    index: HashMap<AssetId, usize>,
}

impl Universe {
    /// Validates and indexes the assets.
    ///
    /// # Errors
    ///
    /// Returns `DataError` if the list is empty, an identifier is duplicated,
    /// or an asset fails validation.
    pub fn new(assets: Vec<Asset>) -> Result<Self, DataError> {
        if assets.is_empty() {
            return Err(DataError::EmptyUniverse);
        }
        let mut index = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            asset.validate()?;
            if index.insert(asset.id.clone(), i).is_some() {
                return Err(DataError::DuplicateAsset(asset.id.to_string()));
            }
        }
        Ok(Self { assets, index })
    }

    /// Number of assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always `false` for a constructed universe.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets in universe order.
    #[inline]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Asset at position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&Asset> {
        self.assets.get(i)
    }

    /// Position of an asset identifier.
    #[inline]
    pub fn position(&self, id: &AssetId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Resolves an identifier or fails with `DataError::UnknownAsset`.
    pub fn require(&self, id: &AssetId) -> Result<usize, DataError> {
        self.position(id)
            .ok_or_else(|| DataError::UnknownAsset(id.to_string()))
    }

    /// Asset classes in universe order.
    pub fn classes(&self) -> Vec<AssetClass> {
        self.assets.iter().map(|a| a.class).collect()
    }

    /// Expected annual returns in universe order.
    pub fn expected_returns(&self) -> Vec<f64> {
        self.assets.iter().map(|a| a.expected_return).collect()
    }

    /// Asset identifiers in universe order.
    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.iter().map(|a| &a.id)
    }

    /// Whether any asset is not daily-liquid.
    pub fn has_illiquid_assets(&self) -> bool {
        self.assets.iter().any(|a| !a.liquidity.is_daily())
    }

    /// Converts an identifier-keyed allocation into a dense weight vector.
    ///
    /// Assets absent from `allocation` receive zero weight.
    pub fn dense_weights<'a, I>(&self, allocation: I) -> Result<Vec<f64>, DataError>
    where
        I: IntoIterator<Item = (&'a AssetId, &'a f64)>,
    {
        let mut weights = vec![0.0; self.len()];
        for (id, w) in allocation {
            weights[self.require(id)?] = *w;
        }
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_duplicate_assets_rejected() {
        let result = Universe::new(vec![
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15),
            Asset::new("EQ", AssetClass::Equity, 0.07, 0.14),
        ]);
        assert_eq!(result, Err(DataError::DuplicateAsset("EQ".to_string())));
    }

    #[test]
    fn test_empty_universe_rejected() {
        assert_eq!(Universe::new(vec![]), Err(DataError::EmptyUniverse));
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let asset = Asset::new("EQ", AssetClass::Equity, 0.08, -0.1);
        assert!(matches!(
            asset.validate(),
            Err(DataError::InvalidAsset { .. })
        ));
    }

    #[test]
    fn test_smoothing_bounds() {
        let asset = Asset::new("PE", AssetClass::Alternative, 0.12, 0.2)
            .with_private_market(PrivateMarketTerms::smoothed(1.0));
        assert!(asset.validate().is_err());

        let asset = Asset::new("PE", AssetClass::Alternative, 0.12, 0.2)
            .with_private_market(PrivateMarketTerms::smoothed(0.6));
        assert!(asset.validate().is_ok());
    }

    #[test]
    fn test_quarterly_gate_windows() {
        let gated = LiquidityClass::QuarterlyGated;
        let open: Vec<usize> = (0..=12).filter(|p| gated.can_trade(*p, 12)).collect();
        assert_eq!(open, vec![0, 3, 6, 9, 12]);
        // annual stepping: every period is a quarter end or coarser
        assert!(gated.can_trade(1, 1));
    }

    #[test]
    fn test_j_curve_shape() {
        let re = JCurve::real_estate();
        assert_relative_eq!(re.annual_adjustment(1.0), -0.025, epsilon = 1e-12);
        assert_relative_eq!(re.annual_adjustment(5.0), 0.15 * 3.0 / 6.0, epsilon = 1e-12);
        assert_eq!(re.annual_adjustment(8.0), 0.0);
        assert_eq!(re.annual_adjustment(-1.0), 0.0);
    }

    #[test]
    fn test_private_market_age() {
        let terms = PrivateMarketTerms::smoothed(0.5).with_j_curve(JCurve::hedge_fund(), -12);
        assert_relative_eq!(terms.age_years(6, 12), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_dense_weights() {
        let universe = Universe::new(vec![
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
        ])
        .unwrap();
        let alloc = vec![(AssetId::new("BOND"), 0.4)];
        let w = universe
            .dense_weights(alloc.iter().map(|(id, w)| (id, w)))
            .unwrap();
        assert_eq!(w, vec![0.0, 0.4]);

        let unknown = vec![(AssetId::new("FX"), 1.0)];
        assert!(universe
            .dense_weights(unknown.iter().map(|(id, w)| (id, w)))
            .is_err());
    }

    #[test]
    fn test_liquidation_rank_order() {
        let mut classes = AssetClass::ALL.to_vec();
        classes.sort_by_key(|c| c.liquidation_rank());
        assert_eq!(classes[0], AssetClass::Cash);
        assert_eq!(classes[4], AssetClass::Alternative);
    }
}
