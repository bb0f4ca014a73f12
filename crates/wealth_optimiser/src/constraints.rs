//! Portfolio constraints and projection onto the feasible set.
//!
//! The feasible set is the intersection of:
//!
//! - the budget simplex with per-asset bounds (non-negativity unless
//!   shorting is enabled, a maximum weight, and pinned weights for assets
//!   that cannot trade this period)
//! - one slab per asset-class band
//! - the liquidity-floor halfspace over daily-liquid assets
//! - the ESG-floor halfspace `Σ sᵢ·wᵢ ≥ min` over asset ESG scores
//! - the L1 turnover ball around the current weights
//!
//! An ESG screen excludes tradable assets that are unscored or score below
//! the threshold by fixing both of their bounds at zero.
//!
//! [`FeasibleRegion::project`] computes the Euclidean projection onto the
//! intersection with Dykstra's alternating projections, finishing on the
//! bounded simplex so that the budget and bounds hold to rounding.
//!
//! Alternating projections only reach the turnover ball in the limit. When
//! the Dykstra point still breaks a constraint, it is pulled back along the
//! segment towards a feasible anchor (the current weights projected onto
//! the other constraints). Every constraint is convex, so the feasible part
//! of that segment is an interval starting at the anchor and bisection finds
//! its far end.

use crate::error::OptimisationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use wealth_core::types::{Asset, AssetClass, AssetId};

/// Tolerance used when checking the final weights.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

const DYKSTRA_MAX_ROUNDS: usize = 5_000;
const DYKSTRA_TOLERANCE: f64 = 1e-13;
const BISECTION_ITERATIONS: usize = 200;
const REPAIR_TOLERANCE: f64 = 1e-9;
const REPAIR_ITERATIONS: usize = 60;

/// Minimum and maximum aggregate weight of one asset class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassBand {
    /// Asset class the band applies to
    pub class: AssetClass,
    /// Minimum aggregate weight
    #[serde(default)]
    pub min: f64,
    /// Maximum aggregate weight
    #[serde(default = "one")]
    pub max: f64,
}

fn one() -> f64 {
    1.0
}

impl ClassBand {
    /// Creates a band.
    pub fn new(class: AssetClass, min: f64, max: f64) -> Self {
        Self { class, min, max }
    }

    /// Band pinning the class weight to `weight`.
    pub fn fixed(class: AssetClass, weight: f64) -> Self {
        Self::new(class, weight, weight)
    }
}

/// Constraints applied to every optimisation.
///
/// # Examples
///
/// ```
/// use wealth_core::types::AssetClass;
/// use wealth_optimiser::constraints::{ClassBand, ConstraintSet};
///
/// let constraints = ConstraintSet::default()
///     .with_class_band(ClassBand::new(AssetClass::Equity, 0.3, 0.7))
///     .with_liquidity_floor(0.5)
///     .with_turnover_cap(0.2);
/// assert!(constraints.validate().is_ok());
/// assert!(!constraints.allow_short);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    /// Permit negative weights
    pub allow_short: bool,
    /// Largest short position per asset when shorting is allowed
    pub short_limit: f64,
    /// Largest weight per asset
    pub max_weight: f64,
    /// Asset-class bands
    pub class_bands: Vec<ClassBand>,
    /// Minimum fraction held in daily-liquid assets
    pub liquidity_floor: f64,
    /// Maximum `Σ|w − w_current|` per rebalance
    pub turnover_cap: Option<f64>,
    /// Minimum weighted ESG score of the portfolio (unscored assets count 0)
    pub min_esg_score: Option<f64>,
    /// Excludes tradable assets scoring below this, or unscored
    pub esg_screen: Option<f64>,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            allow_short: false,
            short_limit: 0.0,
            max_weight: 1.0,
            class_bands: Vec::new(),
            liquidity_floor: 0.0,
            turnover_cap: None,
            min_esg_score: None,
            esg_screen: None,
        }
    }
}

impl ConstraintSet {
    /// Enables shorting down to `-limit` per asset.
    pub fn with_shorting(mut self, limit: f64) -> Self {
        self.allow_short = true;
        self.short_limit = limit;
        self
    }

    /// Sets the per-asset maximum weight.
    pub fn with_max_weight(mut self, max_weight: f64) -> Self {
        self.max_weight = max_weight;
        self
    }

    /// Adds an asset-class band.
    pub fn with_class_band(mut self, band: ClassBand) -> Self {
        self.class_bands.push(band);
        self
    }

    /// Sets the liquidity floor.
    pub fn with_liquidity_floor(mut self, floor: f64) -> Self {
        self.liquidity_floor = floor;
        self
    }

    /// Sets the turnover cap.
    pub fn with_turnover_cap(mut self, cap: f64) -> Self {
        self.turnover_cap = Some(cap);
        self
    }

    /// Sets the portfolio ESG floor.
    pub fn with_min_esg_score(mut self, score: f64) -> Self {
        self.min_esg_score = Some(score);
        self
    }

    /// Screens out assets scoring below `threshold`.
    pub fn with_esg_screen(mut self, threshold: f64) -> Self {
        self.esg_screen = Some(threshold);
        self
    }

    /// Validates parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `OptimisationError::InvalidInput` describing the first
    /// offending parameter.
    pub fn validate(&self) -> Result<(), OptimisationError> {
        if !(self.short_limit >= 0.0) {
            return Err(OptimisationError::invalid("short_limit must be non-negative"));
        }
        if !(self.max_weight > 0.0) {
            return Err(OptimisationError::invalid("max_weight must be positive"));
        }
        if !(0.0..=1.0).contains(&self.liquidity_floor) {
            return Err(OptimisationError::invalid("liquidity_floor must lie in [0, 1]"));
        }
        if let Some(cap) = self.turnover_cap {
            if !(cap >= 0.0) {
                return Err(OptimisationError::invalid("turnover_cap must be non-negative"));
            }
        }
        for (name, score) in [
            ("min_esg_score", self.min_esg_score),
            ("esg_screen", self.esg_screen),
        ] {
            if let Some(score) = score {
                if !(score >= 0.0) || !score.is_finite() {
                    return Err(OptimisationError::invalid(format!(
                        "{name} must be a non-negative score"
                    )));
                }
            }
        }
        for band in &self.class_bands {
            if !(band.min <= band.max) || !band.min.is_finite() || !band.max.is_finite() {
                return Err(OptimisationError::invalid(format!(
                    "class band for {} has min {} above max {}",
                    band.class, band.min, band.max
                )));
            }
        }
        Ok(())
    }
}

/// An asset offered to the optimiser at one rebalance point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateAsset {
    /// Asset identifier
    pub id: AssetId,
    /// Asset class
    pub class: AssetClass,
    /// Counts towards the liquidity floor
    pub daily_liquid: bool,
    /// May trade at this rebalance; otherwise its weight stays at current
    pub tradable: bool,
    /// ESG score, if rated
    #[serde(default)]
    pub esg_score: Option<f64>,
}

impl CandidateAsset {
    /// Freely tradable, daily-liquid candidate.
    pub fn new(id: impl Into<AssetId>, class: AssetClass) -> Self {
        Self {
            id: id.into(),
            class,
            daily_liquid: true,
            tradable: true,
            esg_score: None,
        }
    }

    /// Sets the ESG score.
    pub fn with_esg_score(mut self, score: f64) -> Self {
        self.esg_score = Some(score);
        self
    }

    /// Candidate view of `asset` at `period`.
    pub fn from_asset(asset: &Asset, period: usize, periods_per_year: usize) -> Self {
        Self {
            id: asset.id.clone(),
            class: asset.class,
            daily_liquid: asset.liquidity.is_daily(),
            tradable: asset.liquidity.can_trade(period, periods_per_year),
            esg_score: asset.esg_score,
        }
    }
}

/// A single constraint of the compiled region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "on", rename_all = "snake_case")]
pub enum Constraint {
    /// Weights sum to one
    Budget,
    /// Per-asset lower bound (zero or the short limit)
    LowerBound(AssetId),
    /// Per-asset maximum weight
    UpperBound(AssetId),
    /// Class band minimum
    ClassMinimum(AssetClass),
    /// Class band maximum
    ClassMaximum(AssetClass),
    /// Minimum daily-liquid fraction
    LiquidityFloor,
    /// Minimum portfolio ESG score
    EsgFloor,
    /// Maximum turnover
    TurnoverCap,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Budget => write!(f, "budget"),
            Constraint::LowerBound(id) => write!(f, "lower bound on {id}"),
            Constraint::UpperBound(id) => write!(f, "upper bound on {id}"),
            Constraint::ClassMinimum(class) => write!(f, "{class} minimum"),
            Constraint::ClassMaximum(class) => write!(f, "{class} maximum"),
            Constraint::LiquidityFloor => write!(f, "liquidity floor"),
            Constraint::EsgFloor => write!(f, "ESG floor"),
            Constraint::TurnoverCap => write!(f, "turnover cap"),
        }
    }
}

/// Band expressed on the tradable assets only.
#[derive(Clone, Debug)]
struct CompiledBand {
    band: ClassBand,
    members: Vec<usize>,
    free: Vec<usize>,
}

/// Constraint set compiled against a candidate list.
#[derive(Clone, Debug)]
pub struct FeasibleRegion {
    ids: Vec<AssetId>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    fixed: Vec<bool>,
    bands: Vec<CompiledBand>,
    liquid: Vec<usize>,
    liquid_free: Vec<usize>,
    liquidity_floor: f64,
    esg_scores: Vec<f64>,
    esg_floor: Option<f64>,
    current: Vec<f64>,
    turnover_cap: Option<f64>,
}

impl FeasibleRegion {
    /// Compiles `constraints` for `candidates`.
    ///
    /// `current` supplies the weights of assets that cannot trade and the
    /// centre of the turnover ball. Without current weights every asset must
    /// be tradable and the turnover cap is ignored.
    ///
    /// # Errors
    ///
    /// - `OptimisationError::InvalidInput` for malformed constraints or a
    ///   non-tradable asset without current weights
    /// - `OptimisationError::Infeasible` when a necessary condition fails
    pub fn compile(
        candidates: &[CandidateAsset],
        constraints: &ConstraintSet,
        current: Option<&[f64]>,
    ) -> Result<Self, OptimisationError> {
        constraints.validate()?;
        let n = candidates.len();
        if n == 0 {
            return Err(OptimisationError::invalid("no candidate assets"));
        }
        if let Some(c) = current {
            if c.len() != n {
                return Err(OptimisationError::DimensionMismatch {
                    context: "current weights",
                    expected: n,
                    found: c.len(),
                });
            }
        }
        let floor = if constraints.allow_short {
            -constraints.short_limit
        } else {
            0.0
        };

        let mut lower = vec![floor; n];
        let mut upper = vec![constraints.max_weight; n];
        let mut fixed = vec![false; n];
        for (i, candidate) in candidates.iter().enumerate() {
            if !candidate.tradable {
                let held = current.map(|c| c[i]).ok_or_else(|| {
                    OptimisationError::invalid(format!(
                        "asset '{}' is not tradable but no current weight was supplied",
                        candidate.id
                    ))
                })?;
                lower[i] = held;
                upper[i] = held;
                fixed[i] = true;
            } else if let Some(threshold) = constraints.esg_screen {
                if candidate.esg_score.map_or(true, |s| s < threshold) {
                    lower[i] = 0.0;
                    upper[i] = 0.0;
                }
            }
        }

        let sum_lower: f64 = lower.iter().sum();
        let sum_upper: f64 = upper.iter().sum();
        if sum_lower > 1.0 + FEASIBILITY_TOLERANCE || sum_upper < 1.0 - FEASIBILITY_TOLERANCE {
            return Err(OptimisationError::infeasible(format!(
                "per-asset bounds admit totals in [{sum_lower:.4}, {sum_upper:.4}], which excludes 1"
            )));
        }

        let mut bands = Vec::with_capacity(constraints.class_bands.len());
        for band in &constraints.class_bands {
            let members: Vec<usize> = (0..n).filter(|&i| candidates[i].class == band.class).collect();
            let lo: f64 = members.iter().map(|&i| lower[i]).sum();
            let hi: f64 = members.iter().map(|&i| upper[i]).sum();
            if hi < band.min - FEASIBILITY_TOLERANCE || lo > band.max + FEASIBILITY_TOLERANCE {
                return Err(OptimisationError::infeasible(format!(
                    "{} band [{:.4}, {:.4}] unreachable: attainable class weight is [{lo:.4}, {hi:.4}]",
                    band.class, band.min, band.max
                )));
            }
            let free = members.iter().copied().filter(|&i| !fixed[i]).collect();
            bands.push(CompiledBand {
                band: *band,
                members,
                free,
            });
        }
        if !constraints.allow_short {
            let mut min_total = 0.0;
            for class in AssetClass::ALL {
                let min = bands
                    .iter()
                    .filter(|b| b.band.class == class)
                    .map(|b| b.band.min)
                    .fold(0.0_f64, f64::max);
                min_total += min;
            }
            if min_total > 1.0 + FEASIBILITY_TOLERANCE {
                return Err(OptimisationError::infeasible(format!(
                    "class band minimums sum to {min_total:.4}"
                )));
            }
        }

        let liquid: Vec<usize> = (0..n).filter(|&i| candidates[i].daily_liquid).collect();
        let liquid_upper: f64 = liquid.iter().map(|&i| upper[i]).sum();
        if constraints.liquidity_floor > liquid_upper + FEASIBILITY_TOLERANCE {
            return Err(OptimisationError::infeasible(format!(
                "liquidity floor {:.4} exceeds attainable daily-liquid weight {liquid_upper:.4}",
                constraints.liquidity_floor
            )));
        }
        let liquid_free = liquid.iter().copied().filter(|&i| !fixed[i]).collect();

        let esg_scores: Vec<f64> = candidates
            .iter()
            .map(|c| c.esg_score.unwrap_or(0.0))
            .collect();
        if let Some(min) = constraints.min_esg_score {
            let pinned_weight: f64 = (0..n).filter(|&i| fixed[i]).map(|i| lower[i]).sum();
            let pinned_score: f64 = (0..n)
                .filter(|&i| fixed[i])
                .map(|i| lower[i] * esg_scores[i])
                .sum();
            let best = (0..n)
                .filter(|&i| !fixed[i] && upper[i] > 0.0)
                .map(|i| esg_scores[i])
                .fold(0.0_f64, f64::max);
            let attainable = pinned_score + (1.0 - pinned_weight).max(0.0) * best;
            if min > attainable + FEASIBILITY_TOLERANCE {
                return Err(OptimisationError::infeasible(format!(
                    "ESG floor {min:.2} exceeds attainable portfolio score {attainable:.2}"
                )));
            }
        }

        let (current, turnover_cap) = match current {
            Some(c) => (c.to_vec(), constraints.turnover_cap),
            None => (vec![0.0; n], None),
        };

        Ok(Self {
            ids: candidates.iter().map(|c| c.id.clone()).collect(),
            lower,
            upper,
            fixed,
            bands,
            liquid,
            liquid_free,
            liquidity_floor: constraints.liquidity_floor,
            esg_scores,
            esg_floor: constraints.min_esg_score,
            current,
            turnover_cap,
        })
    }

    /// Number of assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether the region has no assets (never true for a compiled region).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Whether asset `i` is pinned at its current weight.
    #[inline]
    pub fn is_fixed(&self, i: usize) -> bool {
        self.fixed[i]
    }

    /// Per-asset lower bounds.
    #[inline]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Per-asset upper bounds.
    #[inline]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// A feasible-as-possible starting point: the projection of the current
    /// weights, or of equal weights when there are none.
    pub fn starting_point(&self) -> Vec<f64> {
        let n = self.len();
        let has_current = self.current.iter().any(|w| *w != 0.0);
        let seed = if has_current {
            self.current.clone()
        } else {
            vec![1.0 / n as f64; n]
        };
        self.project(&seed)
    }

    /// Euclidean projection of `point` onto the feasible region.
    ///
    /// Pinned assets are returned at their current weight regardless of
    /// `point`. If the alternating projections stop short of the turnover
    /// ball, the point is blended back towards a feasible anchor, so the
    /// result is feasible whenever the anchor is. When the region is empty
    /// the result is the limit point of the alternating projections and
    /// [`FeasibleRegion::violations`] reports what could not be satisfied.
    pub fn project(&self, point: &[f64]) -> Vec<f64> {
        let x: Vec<f64> = point
            .iter()
            .enumerate()
            .map(|(i, v)| if self.fixed[i] { self.lower[i] } else { *v })
            .collect();
        if self.num_sets() == 1 {
            return self.project_bounded_simplex(&x);
        }

        let x = self.dykstra(&x, true);
        if self.turnover_cap.is_none() || self.violations(&x, REPAIR_TOLERANCE).is_empty() {
            return x;
        }
        match self.turnover_anchor() {
            Some(anchor) => self.pull_back(&anchor, &x),
            None => x,
        }
    }

    fn num_sets(&self) -> usize {
        self.bands.len()
            + usize::from(self.liquidity_floor > 0.0)
            + usize::from(self.esg_floor.is_some())
            + usize::from(self.turnover_cap.is_some())
            + 1
    }

    /// Dykstra order index of the turnover ball, if there is one.
    fn turnover_set(&self) -> Option<usize> {
        self.turnover_cap.map(|_| {
            self.bands.len()
                + usize::from(self.liquidity_floor > 0.0)
                + usize::from(self.esg_floor.is_some())
        })
    }

    /// Dykstra's alternating projections, optionally leaving out the
    /// turnover ball.
    ///
    /// Stops once neither the iterate nor any correction increment moves
    /// by more than `DYKSTRA_TOLERANCE` over a full round; the iterate alone
    /// can stall while the increments are still converging.
    fn dykstra(&self, start: &[f64], with_turnover: bool) -> Vec<f64> {
        let skip = if with_turnover {
            None
        } else {
            self.turnover_set()
        };
        let sets: Vec<usize> = (0..self.num_sets()).filter(|k| Some(*k) != skip).collect();
        let n = start.len();
        let mut x = start.to_vec();
        let mut increments = vec![vec![0.0; n]; sets.len()];
        for _ in 0..DYKSTRA_MAX_ROUNDS {
            let previous = x.clone();
            let mut increment_change = 0.0_f64;
            for (&k, increment) in sets.iter().zip(increments.iter_mut()) {
                let shifted: Vec<f64> = x.iter().zip(increment.iter()).map(|(a, b)| a + b).collect();
                let projected = self.project_onto(k, &shifted);
                for i in 0..n {
                    let updated = shifted[i] - projected[i];
                    increment_change = increment_change.max((updated - increment[i]).abs());
                    increment[i] = updated;
                }
                x = projected;
            }
            let change = x
                .iter()
                .zip(&previous)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);
            if change < DYKSTRA_TOLERANCE && increment_change < DYKSTRA_TOLERANCE {
                break;
            }
        }
        x
    }

    /// The current weights projected onto every constraint except the
    /// turnover ball, if that point is feasible.
    fn turnover_anchor(&self) -> Option<Vec<f64>> {
        self.turnover_cap?;
        let anchor = self.dykstra(&self.current, false);
        self.violations(&anchor, REPAIR_TOLERANCE)
            .is_empty()
            .then_some(anchor)
    }

    /// Furthest point from `anchor` towards `target` that is feasible.
    fn pull_back(&self, anchor: &[f64], target: &[f64]) -> Vec<f64> {
        let blend = |t: f64| -> Vec<f64> {
            anchor
                .iter()
                .zip(target)
                .map(|(a, b)| a + t * (b - a))
                .collect()
        };
        let (mut feasible, mut infeasible) = (0.0, 1.0);
        for _ in 0..REPAIR_ITERATIONS {
            let mid = 0.5 * (feasible + infeasible);
            if self.violations(&blend(mid), REPAIR_TOLERANCE).is_empty() {
                feasible = mid;
            } else {
                infeasible = mid;
            }
        }
        blend(feasible)
    }

    /// Projection onto the k-th convex set in Dykstra order.
    fn project_onto(&self, k: usize, point: &[f64]) -> Vec<f64> {
        let n_bands = self.bands.len();
        if k < n_bands {
            let band = &self.bands[k];
            return project_slab(point, &band.members, &band.free, band.band.min, band.band.max);
        }
        let mut k = k - n_bands;
        if self.liquidity_floor > 0.0 {
            if k == 0 {
                return project_slab(
                    point,
                    &self.liquid,
                    &self.liquid_free,
                    self.liquidity_floor,
                    f64::INFINITY,
                );
            }
            k -= 1;
        }
        if let Some(min) = self.esg_floor {
            if k == 0 {
                return project_halfspace(point, &self.esg_scores, min, &self.fixed);
            }
            k -= 1;
        }
        if let Some(cap) = self.turnover_cap {
            if k == 0 {
                return project_l1_ball(point, &self.current, cap, &self.fixed);
            }
        }
        self.project_bounded_simplex(point)
    }

    /// Projection onto `{Σw = 1, lower ≤ w ≤ upper}` by bisection on the shift.
    fn project_bounded_simplex(&self, point: &[f64]) -> Vec<f64> {
        let total = |tau: f64| -> f64 {
            point
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .map(|(v, (lo, hi))| (v - tau).clamp(*lo, *hi))
                .sum()
        };
        let mut tau_low = point
            .iter()
            .zip(&self.upper)
            .map(|(v, hi)| v - hi)
            .fold(f64::INFINITY, f64::min)
            - 1.0;
        let mut tau_high = point
            .iter()
            .zip(&self.lower)
            .map(|(v, lo)| v - lo)
            .fold(f64::NEG_INFINITY, f64::max)
            + 1.0;
        for _ in 0..BISECTION_ITERATIONS {
            let mid = 0.5 * (tau_low + tau_high);
            if total(mid) > 1.0 {
                tau_low = mid;
            } else {
                tau_high = mid;
            }
            if tau_high - tau_low <= f64::EPSILON * tau_high.abs().max(1.0) {
                break;
            }
        }
        let tau = 0.5 * (tau_low + tau_high);
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (lo, hi))| (v - tau).clamp(*lo, *hi))
            .collect()
    }

    /// Constraints violated by `weights` beyond `tol`, with the amount.
    pub fn violations(&self, weights: &[f64], tol: f64) -> Vec<(Constraint, f64)> {
        let mut out = Vec::new();
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > tol {
            out.push((Constraint::Budget, (total - 1.0).abs()));
        }
        for (i, w) in weights.iter().enumerate() {
            if *w < self.lower[i] - tol {
                out.push((Constraint::LowerBound(self.ids[i].clone()), self.lower[i] - w));
            }
            if *w > self.upper[i] + tol {
                out.push((Constraint::UpperBound(self.ids[i].clone()), w - self.upper[i]));
            }
        }
        for band in &self.bands {
            let s: f64 = band.members.iter().map(|&i| weights[i]).sum();
            if s < band.band.min - tol {
                out.push((Constraint::ClassMinimum(band.band.class), band.band.min - s));
            }
            if s > band.band.max + tol {
                out.push((Constraint::ClassMaximum(band.band.class), s - band.band.max));
            }
        }
        let liquid: f64 = self.liquid.iter().map(|&i| weights[i]).sum();
        if liquid < self.liquidity_floor - tol {
            out.push((Constraint::LiquidityFloor, self.liquidity_floor - liquid));
        }
        if let Some(min) = self.esg_floor {
            let score = dot(&self.esg_scores, weights);
            if score < min - tol {
                out.push((Constraint::EsgFloor, min - score));
            }
        }
        if let Some(cap) = self.turnover_cap {
            let turnover = turnover(weights, &self.current);
            if turnover > cap + tol {
                out.push((Constraint::TurnoverCap, turnover - cap));
            }
        }
        out
    }

    /// Inequality constraints active at `weights` (within `tol`).
    ///
    /// Bounds of pinned assets are not reported.
    pub fn binding(&self, weights: &[f64], tol: f64) -> Vec<Constraint> {
        let mut out = Vec::new();
        for (i, w) in weights.iter().enumerate() {
            if self.fixed[i] {
                continue;
            }
            if (*w - self.lower[i]).abs() <= tol {
                out.push(Constraint::LowerBound(self.ids[i].clone()));
            }
            if (*w - self.upper[i]).abs() <= tol {
                out.push(Constraint::UpperBound(self.ids[i].clone()));
            }
        }
        for band in &self.bands {
            let s: f64 = band.members.iter().map(|&i| weights[i]).sum();
            if (s - band.band.min).abs() <= tol {
                out.push(Constraint::ClassMinimum(band.band.class));
            }
            if (s - band.band.max).abs() <= tol {
                out.push(Constraint::ClassMaximum(band.band.class));
            }
        }
        if self.liquidity_floor > 0.0 {
            let liquid: f64 = self.liquid.iter().map(|&i| weights[i]).sum();
            if (liquid - self.liquidity_floor).abs() <= tol {
                out.push(Constraint::LiquidityFloor);
            }
        }
        if let Some(min) = self.esg_floor {
            if (dot(&self.esg_scores, weights) - min).abs() <= tol {
                out.push(Constraint::EsgFloor);
            }
        }
        if let Some(cap) = self.turnover_cap {
            if (turnover(weights, &self.current) - cap).abs() <= tol {
                out.push(Constraint::TurnoverCap);
            }
        }
        out
    }
}

/// `Σ|w − w_current|`.
pub fn turnover(weights: &[f64], current: &[f64]) -> f64 {
    weights
        .iter()
        .zip(current)
        .map(|(a, b)| (a - b).abs())
        .sum()
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Projection onto `{a·x ≥ min}` moving only coordinates that are not fixed.
fn project_halfspace(point: &[f64], a: &[f64], min: f64, fixed: &[bool]) -> Vec<f64> {
    let mut out = point.to_vec();
    let shortfall = min - dot(a, point);
    if shortfall <= 0.0 {
        return out;
    }
    let norm: f64 = a
        .iter()
        .zip(fixed)
        .filter(|(_, f)| !**f)
        .map(|(ai, _)| ai * ai)
        .sum();
    if norm <= 0.0 {
        return out;
    }
    for (i, ai) in a.iter().enumerate() {
        if !fixed[i] {
            out[i] += shortfall * ai / norm;
        }
    }
    out
}

/// Projection onto `{min ≤ Σ_{members} x ≤ max}` moving only `free` members.
fn project_slab(point: &[f64], members: &[usize], free: &[usize], min: f64, max: f64) -> Vec<f64> {
    let mut out = point.to_vec();
    if free.is_empty() {
        return out;
    }
    let s: f64 = members.iter().map(|&i| point[i]).sum();
    let target = if s < min {
        min
    } else if s > max {
        max
    } else {
        return out;
    };
    let shift = (target - s) / free.len() as f64;
    for &i in free {
        out[i] += shift;
    }
    out
}

/// Projection onto the L1 ball of radius `cap` centred at `centre`.
///
/// Pinned coordinates sit at the centre and are left there.
fn project_l1_ball(point: &[f64], centre: &[f64], cap: f64, fixed: &[bool]) -> Vec<f64> {
    let d: Vec<f64> = point
        .iter()
        .zip(centre)
        .enumerate()
        .map(|(i, (p, c))| if fixed[i] { 0.0 } else { p - c })
        .collect();
    let norm: f64 = d.iter().map(|x| x.abs()).sum();
    if norm <= cap {
        return point.to_vec();
    }
    if cap <= 0.0 {
        return point
            .iter()
            .zip(centre)
            .enumerate()
            .map(|(i, (p, c))| if fixed[i] { *p } else { *c })
            .collect();
    }
    let mut magnitudes: Vec<f64> = d.iter().map(|x| x.abs()).collect();
    magnitudes.sort_by(|a, b| b.total_cmp(a));
    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (j, u) in magnitudes.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - cap) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        } else {
            break;
        }
    }
    point
        .iter()
        .zip(centre)
        .zip(&d)
        .enumerate()
        .map(|(i, ((p, c), di))| {
            if fixed[i] {
                *p
            } else {
                c + di.signum() * (di.abs() - theta).max(0.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidates() -> Vec<CandidateAsset> {
        vec![
            CandidateAsset::new("EQ1", AssetClass::Equity),
            CandidateAsset::new("EQ2", AssetClass::Equity),
            CandidateAsset::new("BOND", AssetClass::FixedIncome),
            CandidateAsset {
                daily_liquid: false,
                ..CandidateAsset::new("RE", AssetClass::Alternative)
            },
        ]
    }

    #[test]
    fn test_simplex_projection() {
        let region = FeasibleRegion::compile(&candidates(), &ConstraintSet::default(), None).unwrap();
        let w = region.project(&[0.9, 0.6, -0.2, 0.1]);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(w.iter().all(|x| *x >= 0.0));
        assert_relative_eq!(w[0] - w[1], 0.3, epsilon = 1e-12);
        assert!(region.violations(&w, FEASIBILITY_TOLERANCE).is_empty());
    }

    #[test]
    fn test_band_and_liquidity() {
        let constraints = ConstraintSet::default()
            .with_class_band(ClassBand::new(AssetClass::Equity, 0.2, 0.4))
            .with_liquidity_floor(0.9);
        let region = FeasibleRegion::compile(&candidates(), &constraints, None).unwrap();
        let w = region.project(&[0.5, 0.4, 0.0, 0.1]);
        assert!(region.violations(&w, FEASIBILITY_TOLERANCE).is_empty());
        assert!(w[0] + w[1] <= 0.4 + 1e-6);
        assert!(w[3] <= 0.1 + 1e-6);
        let binding = region.binding(&w, 1e-6);
        assert!(binding.contains(&Constraint::ClassMaximum(AssetClass::Equity)));
    }

    #[test]
    fn test_turnover_ball() {
        let current = [0.25, 0.25, 0.25, 0.25];
        let constraints = ConstraintSet::default().with_turnover_cap(0.1);
        let region = FeasibleRegion::compile(&candidates(), &constraints, Some(&current)).unwrap();
        let w = region.project(&[1.0, 0.0, 0.0, 0.0]);
        assert!(turnover(&w, &current) <= 0.1 + 1e-6);
        assert!(region.violations(&w, FEASIBILITY_TOLERANCE).is_empty());
        assert!(w[0] > 0.25);
    }

    #[test]
    fn test_untradable_asset_is_pinned() {
        let mut c = candidates();
        c[3].tradable = false;
        let current = [0.1, 0.1, 0.1, 0.7];
        let region =
            FeasibleRegion::compile(&c, &ConstraintSet::default(), Some(&current)).unwrap();
        let w = region.project(&[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(w[3], 0.7);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(!region.binding(&w, 1e-9).contains(&Constraint::LowerBound(AssetId::new("RE"))));

        let missing = FeasibleRegion::compile(&c, &ConstraintSet::default(), None);
        assert!(matches!(missing, Err(OptimisationError::InvalidInput(_))));
    }

    #[test]
    fn test_infeasible_prechecks() {
        let too_tight = ConstraintSet::default().with_max_weight(0.2);
        assert!(FeasibleRegion::compile(&candidates(), &too_tight, None)
            .unwrap_err()
            .is_infeasible());

        let bands = ConstraintSet::default()
            .with_class_band(ClassBand::new(AssetClass::Equity, 0.7, 1.0))
            .with_class_band(ClassBand::new(AssetClass::FixedIncome, 0.5, 1.0));
        assert!(FeasibleRegion::compile(&candidates(), &bands, None)
            .unwrap_err()
            .is_infeasible());

        let cash_band =
            ConstraintSet::default().with_class_band(ClassBand::new(AssetClass::Cash, 0.1, 0.2));
        assert!(FeasibleRegion::compile(&candidates(), &cash_band, None)
            .unwrap_err()
            .is_infeasible());

        let inverted =
            ConstraintSet::default().with_class_band(ClassBand::new(AssetClass::Equity, 0.5, 0.2));
        assert!(matches!(
            FeasibleRegion::compile(&candidates(), &inverted, None),
            Err(OptimisationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_shorting_bounds() {
        let constraints = ConstraintSet::default().with_shorting(0.3);
        let region = FeasibleRegion::compile(&candidates(), &constraints, None).unwrap();
        let w = region.project(&[1.5, 0.0, -0.5, 0.0]);
        assert!(w.iter().all(|x| *x >= -0.3 - 1e-12));
        assert!(w.iter().any(|x| *x < 0.0));
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_turnover_cap_holds_with_bands_and_floor() {
        let current = [0.3, 0.1, 0.4, 0.2];
        let constraints = ConstraintSet::default()
            .with_class_band(ClassBand::new(AssetClass::Equity, 0.3, 0.6))
            .with_liquidity_floor(0.7)
            .with_turnover_cap(0.05);
        let region = FeasibleRegion::compile(&candidates(), &constraints, Some(&current)).unwrap();
        for point in [[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], [0.0, 0.5, 0.5, 0.0]] {
            let w = region.project(&point);
            assert!(turnover(&w, &current) <= 0.05 + 1e-9);
            assert!(region.violations(&w, FEASIBILITY_TOLERANCE).is_empty());
        }
    }

    #[test]
    fn test_zero_turnover_cap_returns_current() {
        let current = [0.4, 0.1, 0.3, 0.2];
        let constraints = ConstraintSet::default().with_turnover_cap(0.0);
        let region = FeasibleRegion::compile(&candidates(), &constraints, Some(&current)).unwrap();
        let w = region.project(&[0.0, 1.0, 0.0, 0.0]);
        for (a, b) in w.iter().zip(&current) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_pull_back_stays_on_segment() {
        let current = [0.25, 0.25, 0.25, 0.25];
        let constraints = ConstraintSet::default().with_turnover_cap(0.2);
        let region = FeasibleRegion::compile(&candidates(), &constraints, Some(&current)).unwrap();
        let w = region.pull_back(&current, &[0.55, 0.15, 0.15, 0.15]);
        // full move costs 0.6 of turnover, so a third of it fits
        assert_relative_eq!(w[0], 0.35, epsilon = 1e-9);
        assert_relative_eq!(turnover(&w, &current), 0.2, epsilon = 1e-8);
    }

    fn rated_candidates() -> Vec<CandidateAsset> {
        vec![
            CandidateAsset::new("EQ1", AssetClass::Equity).with_esg_score(40.0),
            CandidateAsset::new("GREEN", AssetClass::Esg).with_esg_score(90.0),
            CandidateAsset::new("BOND", AssetClass::FixedIncome).with_esg_score(60.0),
            CandidateAsset::new("UNRATED", AssetClass::Equity),
        ]
    }

    #[test]
    fn test_esg_floor_lifts_portfolio_score() {
        let constraints = ConstraintSet::default().with_min_esg_score(70.0);
        let region = FeasibleRegion::compile(&rated_candidates(), &constraints, None).unwrap();
        let scores = [40.0, 90.0, 60.0, 0.0];
        let w = region.project(&[0.25, 0.25, 0.25, 0.25]);
        assert!(dot(&scores, &w) >= 70.0 - 1e-6);
        assert!(region.violations(&w, FEASIBILITY_TOLERANCE).is_empty());
        assert!(region.binding(&w, 1e-6).contains(&Constraint::EsgFloor));

        // already above the floor: untouched
        let green = region.project(&[0.0, 1.0, 0.0, 0.0]);
        assert_relative_eq!(green[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_esg_floor_above_best_score_is_infeasible() {
        let constraints = ConstraintSet::default().with_min_esg_score(95.0);
        assert!(FeasibleRegion::compile(&rated_candidates(), &constraints, None)
            .unwrap_err()
            .is_infeasible());
        assert!(ConstraintSet::default()
            .with_min_esg_score(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_esg_screen_excludes_low_and_unrated() {
        let constraints = ConstraintSet::default().with_esg_screen(50.0);
        let region = FeasibleRegion::compile(&rated_candidates(), &constraints, None).unwrap();
        assert_eq!(region.upper()[0], 0.0);
        assert_eq!(region.upper()[3], 0.0);
        let w = region.project(&[0.4, 0.2, 0.2, 0.2]);
        assert!(w[0].abs() < 1e-12 && w[3].abs() < 1e-12);
        assert_relative_eq!(w[1] + w[2], 1.0, epsilon = 1e-12);

        // a held, untradable asset stays pinned even when screened out
        let mut c = rated_candidates();
        c[0].tradable = false;
        let current = [0.3, 0.3, 0.2, 0.2];
        let region = FeasibleRegion::compile(&c, &constraints, Some(&current)).unwrap();
        assert_eq!(region.project(&[0.0, 0.5, 0.5, 0.0])[0], 0.3);
    }

    #[test]
    fn test_l1_projection_exact() {
        let w = project_l1_ball(&[0.6, 0.4], &[0.5, 0.5], 0.1, &[false, false]);
        assert_relative_eq!(w[0], 0.55, epsilon = 1e-15);
        assert_relative_eq!(w[1], 0.45, epsilon = 1e-15);
    }
}
