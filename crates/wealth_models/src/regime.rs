//! Hidden-regime Markov chain.
//!
//! Each regime shifts the drift of risky assets, scales volatility and
//! stresses correlations. The regime path of a scenario is driven by one
//! uniform draw per period, so it is fully determined by the scenario seed.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use wealth_core::math::Matrix;

const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// A market regime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Regime {
    /// Display name
    pub name: String,
    /// Annual drift shift applied to risky assets
    #[serde(default)]
    pub drift_shift: f64,
    /// Multiplier on factor and idiosyncratic volatility
    #[serde(default = "one")]
    pub vol_multiplier: f64,
    /// Correlation blend towards one, in [0, 1]
    #[serde(default)]
    pub correlation_stress: f64,
}

fn one() -> f64 {
    1.0
}

impl Regime {
    /// Creates a regime.
    pub fn new(
        name: impl Into<String>,
        drift_shift: f64,
        vol_multiplier: f64,
        correlation_stress: f64,
    ) -> Self {
        Self {
            name: name.into(),
            drift_shift,
            vol_multiplier,
            correlation_stress,
        }
    }

    /// Unstressed regime.
    pub fn calm() -> Self {
        Self::new("calm", 0.0, 1.0, 0.0)
    }

    /// Bull market: higher drift, lower volatility.
    pub fn bull() -> Self {
        Self::new("bull", 0.02, 0.9, 0.0)
    }

    /// Bear market: negative drift, elevated volatility and correlation.
    pub fn bear() -> Self {
        Self::new("bear", -0.04, 1.3, 0.2)
    }

    /// Crisis: sharp drawdown drift, doubled volatility.
    pub fn crisis() -> Self {
        Self::new("crisis", -0.15, 2.0, 0.5)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !(self.vol_multiplier > 0.0) || !self.vol_multiplier.is_finite() {
            return Err(ModelError::invalid(
                "vol_multiplier",
                format!("regime '{}' must have a positive multiplier", self.name),
            ));
        }
        if !(0.0..=1.0).contains(&self.correlation_stress) {
            return Err(ModelError::invalid(
                "correlation_stress",
                format!("regime '{}' must lie in [0, 1]", self.name),
            ));
        }
        if !self.drift_shift.is_finite() {
            return Err(ModelError::invalid("drift_shift", "must be finite"));
        }
        Ok(())
    }
}

/// Markov chain over market regimes with a per-period transition matrix.
///
/// # Examples
///
/// ```
/// use wealth_models::regime::RegimeSwitching;
///
/// let chain = RegimeSwitching::default_three_state();
/// assert_eq!(chain.len(), 3);
/// // a uniform draw near zero stays in the current state
/// assert_eq!(chain.next_state(1, 0.01), 0);
/// assert_eq!(chain.next_state(0, 0.5), 0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeSwitching {
    regimes: Vec<Regime>,
    transition: Matrix,
    initial: usize,
}

impl RegimeSwitching {
    /// Creates a validated regime chain.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidParameter` if the transition matrix is not
    /// row-stochastic, the initial state is out of range, or any regime has
    /// invalid parameters.
    pub fn new(
        regimes: Vec<Regime>,
        transition: Matrix,
        initial: usize,
    ) -> Result<Self, ModelError> {
        let n = regimes.len();
        if n == 0 {
            return Err(ModelError::invalid("regimes", "at least one regime is required"));
        }
        if transition.rows() != n || transition.cols() != n {
            return Err(ModelError::DimensionMismatch {
                context: "regime transition matrix",
                expected: n,
                found: transition.rows(),
            });
        }
        if initial >= n {
            return Err(ModelError::invalid(
                "initial",
                format!("state {initial} out of range for {n} regimes"),
            ));
        }
        for regime in &regimes {
            regime.validate()?;
        }
        for i in 0..n {
            let row = transition.row(i);
            if row.iter().any(|p| *p < 0.0) {
                return Err(ModelError::invalid(
                    "transition",
                    format!("row {i} has a negative probability"),
                ));
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ModelError::invalid(
                    "transition",
                    format!("row {i} sums to {sum}"),
                ));
            }
        }
        Ok(Self {
            regimes,
            transition,
            initial,
        })
    }

    /// Single calm regime: returns are driven by the factor model alone.
    pub fn calm() -> Self {
        Self {
            regimes: vec![Regime::calm()],
            transition: Matrix::identity(1),
            initial: 0,
        }
    }

    /// Bull / bear / crisis chain calibrated for monthly steps.
    pub fn default_three_state() -> Self {
        let transition = Matrix::from_rows(vec![
            vec![0.95, 0.04, 0.01],
            vec![0.10, 0.85, 0.05],
            vec![0.10, 0.30, 0.60],
        ])
        .unwrap_or_else(|_| Matrix::identity(3));
        Self {
            regimes: vec![Regime::bull(), Regime::bear(), Regime::crisis()],
            transition,
            initial: 0,
        }
    }

    /// Number of regimes.
    #[inline]
    pub fn len(&self) -> usize {
        self.regimes.len()
    }

    /// Always `false`; a chain has at least one regime.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regimes.is_empty()
    }

    /// All regimes in state order.
    #[inline]
    pub fn regimes(&self) -> &[Regime] {
        &self.regimes
    }

    /// Regime at `state`.
    #[inline]
    pub fn regime(&self, state: usize) -> &Regime {
        &self.regimes[state]
    }

    /// Starting state.
    #[inline]
    pub fn initial_state(&self) -> usize {
        self.initial
    }

    /// Transition matrix.
    #[inline]
    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    /// Next state given the current one and a uniform draw in [0, 1).
    pub fn next_state(&self, current: usize, uniform: f64) -> usize {
        let row = self.transition.row(current);
        let mut cumulative = 0.0;
        for (j, p) in row.iter().enumerate() {
            cumulative += p;
            if uniform < cumulative {
                return j;
            }
        }
        // rounding left the cumulative sum just below one
        row.iter().rposition(|p| *p > 0.0).unwrap_or(current)
    }

    /// Long-run state probabilities by power iteration.
    pub fn stationary_distribution(&self) -> Vec<f64> {
        let n = self.len();
        let mut pi = vec![1.0 / n as f64; n];
        for _ in 0..10_000 {
            let mut next = vec![0.0; n];
            for (i, p) in pi.iter().enumerate() {
                for (j, t) in self.transition.row(i).iter().enumerate() {
                    next[j] += p * t;
                }
            }
            let delta: f64 = next.iter().zip(&pi).map(|(a, b)| (a - b).abs()).sum();
            pi = next;
            if delta < 1e-14 {
                break;
            }
        }
        pi
    }
}

impl Default for RegimeSwitching {
    fn default() -> Self {
        Self::calm()
    }
}
