//! Factor covariance model.
//!
//! Asset covariance is reconstructed as `B·F·Bᵀ + diag(ε)` where `F` is the
//! factor covariance, `B` the asset loadings and `ε` the idiosyncratic
//! variances. All quantities are annualised.
//!
//! Every constructor verifies that `F` and the reconstructed asset
//! covariance are positive semi-definite. A non-PSD factor covariance is
//! either rejected with [`ModelError::NotPositiveSemiDefinite`] or, when the
//! caller opts in through [`PsdPolicy::Regularise`], projected to the
//! nearest PSD matrix with a logged warning.
//!
//! [`FactorModel::estimate`] refits `B`, `ε` and `F` from a return history
//! by ordinary least squares, so a model can be re-estimated on simulated
//! or observed data under the same checks.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wealth_core::math::statistics::mean;
use wealth_core::math::{inverse, min_eigenvalue, nearest_positive_semidefinite, Matrix};
use wealth_core::types::Universe;

/// Eigenvalue tolerance (absolute, annual variance units) for PSD checks.
pub const PSD_TOLERANCE: f64 = 1e-10;

/// Handling of a factor covariance that is not positive semi-definite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsdPolicy {
    /// Fail with `ModelError::NotPositiveSemiDefinite`
    #[default]
    Reject,
    /// Project to the nearest PSD matrix and log a warning
    Regularise,
}

/// Factor covariance model for an asset universe.
#[derive(Clone, Debug, PartialEq)]
pub struct FactorModel {
    factor_names: Vec<String>,
    factor_covariance: Matrix,
    loadings: Matrix,
    idiosyncratic_variance: Vec<f64>,
}

impl FactorModel {
    /// Creates a validated factor model.
    ///
    /// # Errors
    ///
    /// - `ModelError::DimensionMismatch` if shapes disagree
    /// - `ModelError::InvalidParameter` for negative or non-finite idiosyncratic variance
    /// - `ModelError::NotPositiveSemiDefinite` if `F` or the reconstructed
    ///   asset covariance has a materially negative eigenvalue
    pub fn new(
        factor_names: Vec<String>,
        factor_covariance: Matrix,
        loadings: Matrix,
        idiosyncratic_variance: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let k = factor_names.len();
        if factor_covariance.rows() != k || factor_covariance.cols() != k {
            return Err(ModelError::DimensionMismatch {
                context: "factor covariance",
                expected: k,
                found: factor_covariance.rows(),
            });
        }
        if loadings.cols() != k {
            return Err(ModelError::DimensionMismatch {
                context: "factor loadings",
                expected: k,
                found: loadings.cols(),
            });
        }
        if idiosyncratic_variance.len() != loadings.rows() {
            return Err(ModelError::DimensionMismatch {
                context: "idiosyncratic variance",
                expected: loadings.rows(),
                found: idiosyncratic_variance.len(),
            });
        }
        if idiosyncratic_variance
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ModelError::invalid(
                "idiosyncratic_variance",
                "entries must be finite and non-negative",
            ));
        }
        if !loadings.is_finite() {
            return Err(ModelError::invalid("loadings", "entries must be finite"));
        }

        factor_covariance.check_symmetric(1e-10)?;
        check_psd(&factor_covariance, "factor covariance")?;

        let model = Self {
            factor_names,
            factor_covariance,
            loadings,
            idiosyncratic_variance,
        };
        model.asset_covariance()?;
        Ok(model)
    }

    /// Builds a model from the exposures and volatilities recorded on each asset.
    ///
    /// Idiosyncratic variance is the part of each asset's total variance not
    /// explained by its factor exposures, floored at zero.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingFactorData` if an asset does not carry one
    /// exposure per factor, plus any error from [`FactorModel::new`].
    pub fn from_universe(
        universe: &Universe,
        factor_names: Vec<String>,
        factor_covariance: Matrix,
        policy: PsdPolicy,
    ) -> Result<Self, ModelError> {
        let k = factor_names.len();
        let mut rows = Vec::with_capacity(universe.len());
        for asset in universe.assets() {
            if asset.exposures.len() != k {
                return Err(ModelError::MissingFactorData(format!(
                    "asset '{}' has {} exposures but the model has {} factors",
                    asset.id,
                    asset.exposures.len(),
                    k
                )));
            }
            rows.push(asset.exposures.clone());
        }
        let loadings = if rows.is_empty() {
            Matrix::zeros(0, k)
        } else {
            Matrix::from_rows(rows)?
        };

        let factor_covariance = match policy {
            PsdPolicy::Reject => factor_covariance,
            PsdPolicy::Regularise => regularise(factor_covariance)?,
        };

        let idiosyncratic_variance = universe
            .assets()
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let systematic = factor_covariance.quad_form(loadings.row(i));
                (asset.volatility * asset.volatility - systematic).max(0.0)
            })
            .collect();

        Self::new(
            factor_names,
            factor_covariance,
            loadings,
            idiosyncratic_variance,
        )
    }

    /// Estimates a model from a return history.
    ///
    /// `factor_returns` and `asset_returns` hold one row per period. Each
    /// asset's returns are regressed on an intercept plus the factor
    /// returns; the slopes become the loadings `B` and the residual variance
    /// (with `T − k − 1` degrees of freedom) the idiosyncratic variance. `F`
    /// is the sample covariance of the factor returns. Variances are
    /// annualised by `periods_per_year` and `F` goes through `policy` before
    /// the checks of [`FactorModel::new`].
    ///
    /// # Errors
    ///
    /// - `ModelError::DimensionMismatch` if the histories disagree in length
    ///   or a factor row does not have one entry per factor
    /// - `ModelError::InvalidParameter` without residual degrees of freedom
    /// - `ModelError::Linalg` for collinear factor returns
    pub fn estimate(
        factor_names: Vec<String>,
        factor_returns: &[Vec<f64>],
        asset_returns: &[Vec<f64>],
        periods_per_year: usize,
        policy: PsdPolicy,
    ) -> Result<Self, ModelError> {
        let k = factor_names.len();
        let t = factor_returns.len();
        if asset_returns.len() != t {
            return Err(ModelError::DimensionMismatch {
                context: "asset return history",
                expected: t,
                found: asset_returns.len(),
            });
        }
        if let Some(row) = factor_returns.iter().find(|r| r.len() != k) {
            return Err(ModelError::DimensionMismatch {
                context: "factor return history",
                expected: k,
                found: row.len(),
            });
        }
        if t <= k + 1 {
            return Err(ModelError::invalid(
                "factor_returns",
                "need more periods than factors plus one",
            ));
        }
        if periods_per_year == 0 {
            return Err(ModelError::invalid("periods_per_year", "must be positive"));
        }
        let ppy = periods_per_year as f64;

        let design = Matrix::from_rows(
            factor_returns
                .iter()
                .map(|f| std::iter::once(1.0).chain(f.iter().copied()).collect())
                .collect(),
        )?;
        let returns = Matrix::from_rows(asset_returns.to_vec())?;
        let n = returns.cols();
        let design_t = design.transpose();
        let coefficients = inverse(&design_t.mul(&design)?)?
            .mul(&design_t)?
            .mul(&returns)?;
        let fitted = design.mul(&coefficients)?;

        let mut loadings = Matrix::zeros(n, k);
        for i in 0..n {
            for j in 0..k {
                loadings[(i, j)] = coefficients[(j + 1, i)];
            }
        }
        let dof = (t - k - 1) as f64;
        let idiosyncratic_variance = (0..n)
            .map(|i| {
                let sse: f64 = (0..t)
                    .map(|p| (returns[(p, i)] - fitted[(p, i)]).powi(2))
                    .sum();
                sse / dof * ppy
            })
            .collect();

        let means: Vec<f64> = (0..k)
            .map(|j| mean(&factor_returns.iter().map(|r| r[j]).collect::<Vec<_>>()))
            .collect();
        let mut factor_covariance = Matrix::zeros(k, k);
        for a in 0..k {
            for b in a..k {
                let c: f64 = factor_returns
                    .iter()
                    .map(|r| (r[a] - means[a]) * (r[b] - means[b]))
                    .sum::<f64>()
                    / (t - 1) as f64
                    * ppy;
                factor_covariance[(a, b)] = c;
                factor_covariance[(b, a)] = c;
            }
        }
        let factor_covariance = match policy {
            PsdPolicy::Reject => factor_covariance,
            PsdPolicy::Regularise => regularise(factor_covariance)?,
        };
        debug!(periods = t, assets = n, factors = k, "Factor model estimated");

        Self::new(
            factor_names,
            factor_covariance,
            loadings,
            idiosyncratic_variance,
        )
    }

    /// Refits this model's factors on a new history.
    ///
    /// # Errors
    ///
    /// As [`FactorModel::estimate`], plus `ModelError::DimensionMismatch`
    /// when the history covers a different number of assets.
    pub fn reestimate(
        &self,
        factor_returns: &[Vec<f64>],
        asset_returns: &[Vec<f64>],
        periods_per_year: usize,
        policy: PsdPolicy,
    ) -> Result<Self, ModelError> {
        let refit = Self::estimate(
            self.factor_names.clone(),
            factor_returns,
            asset_returns,
            periods_per_year,
            policy,
        )?;
        if refit.n_assets() != self.n_assets() {
            return Err(ModelError::DimensionMismatch {
                context: "re-estimated assets",
                expected: self.n_assets(),
                found: refit.n_assets(),
            });
        }
        Ok(refit)
    }

    /// Factor names in model order.
    #[inline]
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    /// Position of a named factor.
    pub fn factor_index(&self, name: &str) -> Option<usize> {
        self.factor_names.iter().position(|f| f == name)
    }

    /// Number of factors.
    #[inline]
    pub fn n_factors(&self) -> usize {
        self.factor_names.len()
    }

    /// Number of assets.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.loadings.rows()
    }

    /// Annual factor covariance `F`.
    #[inline]
    pub fn factor_covariance(&self) -> &Matrix {
        &self.factor_covariance
    }

    /// Asset loadings `B` (assets × factors).
    #[inline]
    pub fn loadings(&self) -> &Matrix {
        &self.loadings
    }

    /// Annual idiosyncratic variances.
    #[inline]
    pub fn idiosyncratic_variance(&self) -> &[f64] {
        &self.idiosyncratic_variance
    }

    /// Reconstructs the annual asset covariance `B·F·Bᵀ + diag(ε)`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::NotPositiveSemiDefinite` if the reconstruction
    /// is not PSD.
    pub fn asset_covariance(&self) -> Result<Matrix, ModelError> {
        let systematic = self
            .loadings
            .mul(&self.factor_covariance)?
            .mul(&self.loadings.transpose())?;
        let cov = systematic
            .add(&Matrix::from_diagonal(&self.idiosyncratic_variance))?
            .symmetrised();
        check_psd(&cov, "asset covariance")?;
        Ok(cov)
    }

    /// Model under stressed conditions.
    ///
    /// Factor and idiosyncratic volatilities are multiplied by
    /// `vol_multiplier`; off-diagonal factor correlations are blended
    /// towards one by `correlation_stress` (`ρ' = (1 − κ)·ρ + κ`). Both
    /// operations preserve positive semi-definiteness.
    pub fn stressed(
        &self,
        vol_multiplier: f64,
        correlation_stress: f64,
    ) -> Result<FactorModel, ModelError> {
        if !(vol_multiplier > 0.0) || !vol_multiplier.is_finite() {
            return Err(ModelError::invalid(
                "vol_multiplier",
                "must be positive and finite",
            ));
        }
        if !(0.0..=1.0).contains(&correlation_stress) {
            return Err(ModelError::invalid(
                "correlation_stress",
                "must lie in [0, 1]",
            ));
        }
        let k = self.n_factors();
        let vols: Vec<f64> = self
            .factor_covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect();
        let mut stressed = Matrix::zeros(k, k);
        for i in 0..k {
            for j in 0..k {
                let rho = if i == j {
                    1.0
                } else if vols[i] > 0.0 && vols[j] > 0.0 {
                    let base = self.factor_covariance[(i, j)] / (vols[i] * vols[j]);
                    (1.0 - correlation_stress) * base + correlation_stress
                } else {
                    0.0
                };
                stressed[(i, j)] = vol_multiplier * vols[i] * vol_multiplier * vols[j] * rho;
            }
        }
        let m2 = vol_multiplier * vol_multiplier;
        Self::new(
            self.factor_names.clone(),
            stressed,
            self.loadings.clone(),
            self.idiosyncratic_variance.iter().map(|v| v * m2).collect(),
        )
    }
}

fn check_psd(matrix: &Matrix, context: &'static str) -> Result<(), ModelError> {
    if matrix.rows() == 0 {
        return Ok(());
    }
    let min = min_eigenvalue(matrix)?;
    if min < -PSD_TOLERANCE {
        return Err(ModelError::NotPositiveSemiDefinite {
            context,
            min_eigenvalue: min,
        });
    }
    Ok(())
}

/// Projects a factor covariance to the nearest PSD matrix if needed.
///
/// A matrix that is already PSD is returned unchanged. Otherwise the
/// repair is logged at `warn` level with the offending eigenvalue.
pub fn regularise(factor_covariance: Matrix) -> Result<Matrix, ModelError> {
    factor_covariance.check_symmetric(1e-10)?;
    let min = min_eigenvalue(&factor_covariance)?;
    if min >= -PSD_TOLERANCE {
        return Ok(factor_covariance);
    }
    warn!(
        min_eigenvalue = min,
        "Factor covariance is not positive semi-definite; projecting to nearest PSD matrix"
    );
    Ok(nearest_positive_semidefinite(&factor_covariance, 0.0)?)
}
