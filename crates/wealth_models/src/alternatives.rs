//! Private-market valuation adjustments.
//!
//! Appraisal-based assets report smoothed returns: the reported return is a
//! blend of the current true return and the previous reported one. Assets
//! with a vintage J-curve additionally carry a deterministic, age-dependent
//! excess return.

use wealth_core::types::PrivateMarketTerms;

/// Reported return under first-order appraisal smoothing.
///
/// `r_reported = (1 − α)·r_true + α·r_reported_prev`
///
/// # Examples
///
/// ```
/// use wealth_models::alternatives::smooth_appraisal;
///
/// assert_eq!(smooth_appraisal(0.10, 0.0, 0.0), 0.10);
/// assert!((smooth_appraisal(0.10, 0.02, 0.5) - 0.06).abs() < 1e-12);
/// ```
#[inline]
pub fn smooth_appraisal(true_return: f64, previous_reported: f64, smoothing: f64) -> f64 {
    (1.0 - smoothing) * true_return + smoothing * previous_reported
}

/// Recovers the true return from a smoothed series (Geltner unsmoothing).
///
/// Inverse of [`smooth_appraisal`]. Returns `reported` unchanged when
/// `smoothing` is at or above one.
#[inline]
pub fn unsmooth_appraisal(reported: f64, previous_reported: f64, smoothing: f64) -> f64 {
    if smoothing >= 1.0 {
        return reported;
    }
    (reported - smoothing * previous_reported) / (1.0 - smoothing)
}

/// Per-period J-curve excess return at `period`, or zero without a J-curve.
pub fn j_curve_return(terms: &PrivateMarketTerms, period: usize, periods_per_year: usize) -> f64 {
    terms.j_curve.map_or(0.0, |curve| {
        curve.annual_adjustment(terms.age_years(period, periods_per_year))
            / periods_per_year.max(1) as f64
    })
}

/// Applies the private-market adjustments to one true return.
///
/// Returns the reported return: J-curve excess added to the true return,
/// then smoothed against the previous reported value.
pub fn reported_return(
    terms: &PrivateMarketTerms,
    true_return: f64,
    previous_reported: f64,
    period: usize,
    periods_per_year: usize,
) -> f64 {
    let adjusted = true_return + j_curve_return(terms, period, periods_per_year);
    smooth_appraisal(adjusted, previous_reported, terms.smoothing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use wealth_core::types::JCurve;

    #[test]
    fn test_j_curve_per_period() {
        let terms = PrivateMarketTerms::smoothed(0.0).with_j_curve(JCurve::private_equity(), 0);
        assert_relative_eq!(j_curve_return(&terms, 0, 12), -0.15 / 12.0, epsilon = 1e-15);
        assert_relative_eq!(j_curve_return(&terms, 36, 12), 0.0, epsilon = 1e-15);
        // beyond fund life
        assert_eq!(j_curve_return(&terms, 200, 12), 0.0);
    }

    #[test]
    fn test_no_j_curve() {
        let terms = PrivateMarketTerms::smoothed(0.4);
        assert_eq!(j_curve_return(&terms, 5, 12), 0.0);
        assert_relative_eq!(
            reported_return(&terms, 0.05, 0.01, 5, 12),
            0.6 * 0.05 + 0.4 * 0.01,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_smoothing_reduces_variance() {
        let series = [0.05, -0.04, 0.06, -0.03, 0.02, -0.05, 0.07];
        let mut prev = 0.0;
        let smoothed: Vec<f64> = series
            .iter()
            .map(|r| {
                prev = smooth_appraisal(*r, prev, 0.6);
                prev
            })
            .collect();
        let var = |xs: &[f64]| {
            let m = xs.iter().sum::<f64>() / xs.len() as f64;
            xs.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        };
        assert!(var(&smoothed) < var(&series));
    }

    proptest! {
        #[test]
        fn prop_unsmooth_inverts_smooth(
            r in -0.5f64..0.5,
            prev in -0.5f64..0.5,
            alpha in 0.0f64..0.95,
        ) {
            let reported = smooth_appraisal(r, prev, alpha);
            prop_assert!((unsmooth_appraisal(reported, prev, alpha) - r).abs() < 1e-9);
        }
    }
}
