//! Per-scenario return sampler.
//!
//! [`ReturnModel`] combines the factor model, the regime chain and the
//! private-market adjustments into a single period step:
//!
//! 1. draw the next regime from one uniform
//! 2. draw `k` factor normals, correlated through the regime's factor covariance root
//! 3. optionally mix with a chi-square draw for Student-t tails
//! 4. draw one idiosyncratic normal per asset
//! 5. add the per-period drift, floor at −99%
//! 6. apply J-curve and appraisal smoothing to private-market assets
//!
//! The scenario's regime and last reported alternative returns live in an
//! explicit [`ScenarioState`] value that the caller threads from period to
//! period. The sampler itself holds no mutable state and is shared across
//! worker threads by reference.

use crate::alternatives::reported_return;
use crate::error::ModelError;
use crate::factor::FactorModel;
use crate::regime::RegimeSwitching;
use crate::rng::{derive_seed, SimRng};
use rand_distr::ChiSquared;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use wealth_core::math::{covariance_factor, Matrix};
use wealth_core::types::{AssetId, Universe};

/// Simple returns are floored here so that no holding goes negative.
pub const RETURN_FLOOR: f64 = -0.99;

const FACTOR_TOLERANCE: f64 = 1e-12;

/// Shape of the joint innovation distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TailModel {
    /// Multivariate normal innovations
    #[default]
    Gaussian,
    /// Multivariate Student-t innovations with unit variance
    StudentT {
        /// Degrees of freedom, strictly greater than two
        degrees_of_freedom: f64,
    },
}

/// Regime and smoothing memory of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioState {
    /// Current regime index
    pub regime: usize,
    /// Last reported return per asset (used by appraisal smoothing)
    pub previous_reported: Vec<f64>,
}

/// Returns drawn for a single period of a single scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodDraw {
    /// Period index
    pub period: usize,
    /// Regime in force during the period
    pub regime: usize,
    /// Reported simple return per asset, in universe order
    pub asset_returns: Vec<f64>,
    /// Realised factor returns
    pub factor_returns: Vec<f64>,
}

/// Pre-computed per-period sampling parameters for one regime.
#[derive(Clone, Debug)]
struct RegimeParameters {
    factor_root: Matrix,
    idiosyncratic_std: Vec<f64>,
    drift: Vec<f64>,
}

/// Forward-looking multi-asset return model.
#[derive(Clone, Debug)]
pub struct ReturnModel {
    universe: Arc<Universe>,
    factor_model: FactorModel,
    regimes: RegimeSwitching,
    periods_per_year: usize,
    tail: TailModel,
    chi_squared: Option<ChiSquared<f64>>,
    parameters: Vec<RegimeParameters>,
    base_covariance: Matrix,
}

impl ReturnModel {
    /// Creates a return model.
    ///
    /// Every regime's stressed factor model is built and verified once here,
    /// so sampling never fails on the covariance.
    ///
    /// # Errors
    ///
    /// - `ModelError::InvalidParameter` if `periods_per_year` is zero
    /// - `ModelError::DimensionMismatch` if the factor model and universe disagree
    /// - `ModelError::NotPositiveSemiDefinite` if a regime covariance is not PSD
    pub fn new(
        universe: Arc<Universe>,
        factor_model: FactorModel,
        regimes: RegimeSwitching,
        periods_per_year: usize,
    ) -> Result<Self, ModelError> {
        if periods_per_year == 0 {
            return Err(ModelError::invalid("periods_per_year", "must be positive"));
        }
        if factor_model.n_assets() != universe.len() {
            return Err(ModelError::DimensionMismatch {
                context: "factor loadings vs universe",
                expected: universe.len(),
                found: factor_model.n_assets(),
            });
        }
        let base_covariance = factor_model.asset_covariance()?;
        let ppy = periods_per_year as f64;

        let parameters = regimes
            .regimes()
            .iter()
            .map(|regime| {
                let stressed =
                    factor_model.stressed(regime.vol_multiplier, regime.correlation_stress)?;
                let factor_root = covariance_factor(
                    &stressed.factor_covariance().scale(1.0 / ppy),
                    FACTOR_TOLERANCE,
                )?;
                let idiosyncratic_std = stressed
                    .idiosyncratic_variance()
                    .iter()
                    .map(|v| (v / ppy).sqrt())
                    .collect();
                let drift = universe
                    .assets()
                    .iter()
                    .map(|a| {
                        let shift = if a.class.is_risky() {
                            regime.drift_shift
                        } else {
                            0.0
                        };
                        (a.expected_return + shift) / ppy
                    })
                    .collect();
                Ok(RegimeParameters {
                    factor_root,
                    idiosyncratic_std,
                    drift,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(Self {
            universe,
            factor_model,
            regimes,
            periods_per_year,
            tail: TailModel::Gaussian,
            chi_squared: None,
            parameters,
            base_covariance,
        })
    }

    /// Switches the innovation distribution.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidParameter` unless the Student-t degrees of
    /// freedom exceed two (finite variance).
    pub fn with_tail_model(mut self, tail: TailModel) -> Result<Self, ModelError> {
        self.chi_squared = match tail {
            TailModel::Gaussian => None,
            TailModel::StudentT { degrees_of_freedom } => {
                if !(degrees_of_freedom > 2.0) || !degrees_of_freedom.is_finite() {
                    return Err(ModelError::invalid(
                        "degrees_of_freedom",
                        "must be finite and greater than 2",
                    ));
                }
                Some(ChiSquared::new(degrees_of_freedom).map_err(|e| {
                    ModelError::invalid("degrees_of_freedom", e.to_string())
                })?)
            }
        };
        self.tail = tail;
        Ok(self)
    }

    /// Asset universe.
    #[inline]
    pub fn universe(&self) -> &Arc<Universe> {
        &self.universe
    }

    /// Underlying (unstressed) factor model.
    #[inline]
    pub fn factor_model(&self) -> &FactorModel {
        &self.factor_model
    }

    /// Regime chain.
    #[inline]
    pub fn regimes(&self) -> &RegimeSwitching {
        &self.regimes
    }

    /// Simulation periods per year.
    #[inline]
    pub fn periods_per_year(&self) -> usize {
        self.periods_per_year
    }

    /// Innovation distribution.
    #[inline]
    pub fn tail_model(&self) -> TailModel {
        self.tail
    }

    /// Annual expected returns in universe order.
    pub fn expected_returns(&self) -> Vec<f64> {
        self.universe.expected_returns()
    }

    /// Annual asset covariance of the unstressed model.
    #[inline]
    pub fn covariance(&self) -> &Matrix {
        &self.base_covariance
    }

    /// State at the start of every scenario.
    pub fn initial_state(&self) -> ScenarioState {
        ScenarioState {
            regime: self.regimes.initial_state(),
            previous_reported: vec![0.0; self.universe.len()],
        }
    }

    /// Draws one period's returns and returns them with the next scenario state.
    ///
    /// Random draws are consumed in a fixed order (regime uniform, factor
    /// normals, optional chi-square, idiosyncratic normals), so the same
    /// generator state always yields the same draw.
    pub fn draw_period(
        &self,
        state: &ScenarioState,
        period: usize,
        rng: &mut SimRng,
    ) -> (PeriodDraw, ScenarioState) {
        let regime = self.regimes.next_state(state.regime, rng.gen_uniform());
        let params = &self.parameters[regime];

        let k = self.factor_model.n_factors();
        let mut z = vec![0.0; k];
        rng.fill_normal(&mut z);
        let mut factor_returns = vec![0.0; k];
        for (i, f) in factor_returns.iter_mut().enumerate() {
            *f = params
                .factor_root
                .row(i)
                .iter()
                .zip(&z)
                .map(|(l, zi)| l * zi)
                .sum();
        }

        let scale = match &self.chi_squared {
            Some(chi) => {
                let nu = match self.tail {
                    TailModel::StudentT { degrees_of_freedom } => degrees_of_freedom,
                    TailModel::Gaussian => 0.0,
                };
                let w = rng.sample(chi).max(f64::MIN_POSITIVE);
                ((nu - 2.0) / w).sqrt()
            }
            None => 1.0,
        };
        for f in factor_returns.iter_mut() {
            *f *= scale;
        }

        let loadings = self.factor_model.loadings();
        let mut asset_returns = Vec::with_capacity(self.universe.len());
        let mut previous_reported = Vec::with_capacity(self.universe.len());
        for (i, asset) in self.universe.assets().iter().enumerate() {
            let systematic: f64 = loadings
                .row(i)
                .iter()
                .zip(&factor_returns)
                .map(|(b, f)| b * f)
                .sum();
            let idiosyncratic = scale * params.idiosyncratic_std[i] * rng.gen_normal();
            let true_return = (params.drift[i] + systematic + idiosyncratic).max(RETURN_FLOOR);
            let reported = match &asset.private_market {
                Some(terms) => reported_return(
                    terms,
                    true_return,
                    state.previous_reported[i],
                    period,
                    self.periods_per_year,
                )
                .max(RETURN_FLOOR),
                None => true_return,
            };
            asset_returns.push(reported);
            previous_reported.push(reported);
        }

        (
            PeriodDraw {
                period,
                regime,
                asset_returns,
                factor_returns,
            },
            ScenarioState {
                regime,
                previous_reported,
            },
        )
    }

    /// Cross-section of returns at `period` across `num_scenarios` scenarios.
    ///
    /// Each scenario runs its own regime path from period 1, seeded from
    /// `(seed, 0, scenario)`, so the draw for a given scenario matches what
    /// the path simulator sees for client index 0.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidParameter` if `period` is zero.
    pub fn sample_returns(
        &self,
        period: usize,
        num_scenarios: usize,
        seed: u64,
    ) -> Result<HashMap<AssetId, Vec<f64>>, ModelError> {
        if period == 0 {
            return Err(ModelError::invalid("period", "periods are numbered from 1"));
        }
        let mut columns = vec![Vec::with_capacity(num_scenarios); self.universe.len()];
        for scenario in 0..num_scenarios {
            let mut rng = SimRng::from_seed(derive_seed(seed, 0, scenario as u64));
            let mut state = self.initial_state();
            let mut last = None;
            for t in 1..=period {
                let (draw, next) = self.draw_period(&state, t, &mut rng);
                state = next;
                last = Some(draw);
            }
            if let Some(draw) = last {
                for (column, r) in columns.iter_mut().zip(draw.asset_returns) {
                    column.push(r);
                }
            }
        }
        Ok(self.universe.ids().cloned().zip(columns).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::Regime;
    use approx::assert_relative_eq;
    use wealth_core::math::statistics::{excess_kurtosis, mean, std_dev};
    use wealth_core::types::{Asset, AssetClass, JCurve, PrivateMarketTerms};

    fn universe() -> Arc<Universe> {
        Arc::new(
            Universe::new(vec![
                Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0, 0.0]),
                Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05)
                    .with_exposures(vec![0.0, 1.0]),
            ])
            .unwrap(),
        )
    }

    fn factors(universe: &Universe) -> FactorModel {
        FactorModel::from_universe(
            universe,
            vec!["equity".into(), "rates".into()],
            Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
            crate::factor::PsdPolicy::Reject,
        )
        .unwrap()
    }

    fn model() -> ReturnModel {
        let u = universe();
        let f = factors(&u);
        ReturnModel::new(u, f, RegimeSwitching::calm(), 12).unwrap()
    }

    #[test]
    fn test_monthly_moments() {
        let draws = model().sample_returns(1, 20_000, 7).unwrap();
        let eq = &draws[&AssetId::new("EQ")];
        assert_eq!(eq.len(), 20_000);
        assert!((mean(eq) - 0.08 / 12.0).abs() < 0.002);
        assert!((std_dev(eq) - 0.15 / 12f64.sqrt()).abs() < 0.002);
    }

    #[test]
    fn test_sample_is_deterministic() {
        let m = model();
        assert_eq!(
            m.sample_returns(3, 50, 11).unwrap(),
            m.sample_returns(3, 50, 11).unwrap()
        );
        assert!(m.sample_returns(0, 5, 11).is_err());
    }

    #[test]
    fn test_draw_consumes_state() {
        let m = model();
        let mut rng = SimRng::from_seed(5);
        let (draw, next) = m.draw_period(&m.initial_state(), 1, &mut rng);
        assert_eq!(draw.asset_returns.len(), 2);
        assert_eq!(draw.factor_returns.len(), 2);
        assert_eq!(next.previous_reported, draw.asset_returns);
        assert!(draw.asset_returns.iter().all(|r| *r >= RETURN_FLOOR));
    }

    #[test]
    fn test_student_t_has_fatter_tails() {
        let m = model()
            .with_tail_model(TailModel::StudentT {
                degrees_of_freedom: 5.0,
            })
            .unwrap();
        let eq = &m.sample_returns(1, 20_000, 3).unwrap()[&AssetId::new("EQ")];
        assert!(excess_kurtosis(eq) > 1.0);
        // unit-variance scaling keeps the volatility close to the Gaussian one
        assert!((std_dev(eq) - 0.15 / 12f64.sqrt()).abs() < 0.004);

        assert!(model()
            .with_tail_model(TailModel::StudentT {
                degrees_of_freedom: 2.0
            })
            .is_err());
    }

    #[test]
    fn test_crisis_regime_shifts_risky_drift_only() {
        let u = universe();
        let f = factors(&u);
        let crisis = RegimeSwitching::new(vec![Regime::crisis()], Matrix::identity(1), 0).unwrap();
        let m = ReturnModel::new(u, f, crisis, 12).unwrap();
        let draws = m.sample_returns(1, 20_000, 9).unwrap();
        let eq = &draws[&AssetId::new("EQ")];
        let bond = &draws[&AssetId::new("BOND")];
        assert!((mean(eq) - (0.08 - 0.15) / 12.0).abs() < 0.004);
        assert!((mean(bond) - 0.03 / 12.0).abs() < 0.001);
        assert!((std_dev(eq) - 2.0 * 0.15 / 12f64.sqrt()).abs() < 0.004);
    }

    #[test]
    fn test_private_market_smoothing_and_j_curve() {
        let terms = PrivateMarketTerms::smoothed(0.5).with_j_curve(JCurve::private_equity(), 0);
        let u = Arc::new(
            Universe::new(vec![Asset::new("PE", AssetClass::Alternative, 0.12, 0.0)
                .with_exposures(vec![0.0])
                .with_private_market(terms)])
            .unwrap(),
        );
        let f = FactorModel::from_universe(
            &u,
            vec!["mkt".into()],
            Matrix::from_rows(vec![vec![0.04]]).unwrap(),
            crate::factor::PsdPolicy::Reject,
        )
        .unwrap();
        let m = ReturnModel::new(u, f, RegimeSwitching::calm(), 12).unwrap();
        let mut rng = SimRng::from_seed(1);
        let (draw, _) = m.draw_period(&m.initial_state(), 0, &mut rng);
        // zero volatility: true = 0.01 drift - 0.0125 J-curve, then halved
        assert_relative_eq!(
            draw.asset_returns[0],
            0.5 * (0.12 / 12.0 - 0.15 / 12.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_universe_mismatch() {
        let u = universe();
        let f = factors(&u);
        let other = Arc::new(
            Universe::new(vec![Asset::new("X", AssetClass::Cash, 0.01, 0.0)
                .with_exposures(vec![0.0, 0.0])])
            .unwrap(),
        );
        assert!(matches!(
            ReturnModel::new(other, f, RegimeSwitching::calm(), 12),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
