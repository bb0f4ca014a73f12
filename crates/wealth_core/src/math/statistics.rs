//! Sample statistics and the standard normal distribution.
//!
//! Moment and quantile functions are generic over `T: Float` so they serve
//! both `f64` and `f32` samples.
//!
//! ## Quantile Convention
//!
//! [`quantile`] interpolates linearly between order statistics
//! (Hyndman–Fan type 7): with `n` sorted observations and probability `p`,
//! `h = (n − 1)·p` and `q = x⌊h⌋ + (h − ⌊h⌋)·(x⌊h⌋+1 − x⌊h⌋)`.

use num_traits::Float;

#[inline]
fn constant<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

#[inline]
fn count<T: Float>(n: usize) -> T {
    T::from(n).unwrap_or_else(T::nan)
}

/// Arithmetic mean; zero for an empty sample.
pub fn mean<T: Float>(xs: &[T]) -> T {
    if xs.is_empty() {
        return T::zero();
    }
    xs.iter().fold(T::zero(), |acc, &x| acc + x) / count(xs.len())
}

/// Unbiased sample variance (`n − 1` denominator); zero for fewer than two points.
pub fn variance<T: Float>(xs: &[T]) -> T {
    if xs.len() < 2 {
        return T::zero();
    }
    let m = mean(xs);
    let ss = xs.iter().fold(T::zero(), |acc, &x| acc + (x - m) * (x - m));
    ss / count(xs.len() - 1)
}

/// Sample standard deviation.
pub fn std_dev<T: Float>(xs: &[T]) -> T {
    variance(xs).sqrt()
}

/// Sample skewness (moment estimator `g1`).
pub fn skewness<T: Float>(xs: &[T]) -> T {
    if xs.len() < 3 {
        return T::zero();
    }
    let m = mean(xs);
    let n = count::<T>(xs.len());
    let m2 = xs.iter().fold(T::zero(), |a, &x| a + (x - m).powi(2)) / n;
    let m3 = xs.iter().fold(T::zero(), |a, &x| a + (x - m).powi(3)) / n;
    if m2 <= T::zero() {
        return T::zero();
    }
    m3 / m2.powf(constant(1.5))
}

/// Sample excess kurtosis (moment estimator `g2`).
pub fn excess_kurtosis<T: Float>(xs: &[T]) -> T {
    if xs.len() < 4 {
        return T::zero();
    }
    let m = mean(xs);
    let n = count::<T>(xs.len());
    let m2 = xs.iter().fold(T::zero(), |a, &x| a + (x - m).powi(2)) / n;
    let m4 = xs.iter().fold(T::zero(), |a, &x| a + (x - m).powi(4)) / n;
    if m2 <= T::zero() {
        return T::zero();
    }
    m4 / (m2 * m2) - constant(3.0)
}

/// Root-mean-square shortfall below `target`.
///
/// `sqrt(mean(min(x − target, 0)²))` over the whole sample.
pub fn downside_deviation<T: Float>(xs: &[T], target: T) -> T {
    if xs.is_empty() {
        return T::zero();
    }
    let ss = xs.iter().fold(T::zero(), |acc, &x| {
        let d = (x - target).min(T::zero());
        acc + d * d
    });
    (ss / count(xs.len())).sqrt()
}

/// Quantile of an ascending-sorted sample (type 7 interpolation).
///
/// `p` is clamped to [0, 1]. Returns NaN for an empty sample.
///
/// # Examples
///
/// ```
/// use wealth_core::math::statistics::quantile_sorted;
///
/// let xs = [10.0_f64, 20.0, 30.0, 40.0, 50.0];
/// assert_eq!(quantile_sorted(&xs, 0.0), 10.0);
/// assert_eq!(quantile_sorted(&xs, 0.5), 30.0);
/// assert!((quantile_sorted(&xs, 0.95) - 48.0).abs() < 1e-12);
/// ```
pub fn quantile_sorted<T: Float>(sorted: &[T], p: f64) -> T {
    let n = sorted.len();
    if n == 0 {
        return T::nan();
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = constant::<T>(h - lo as f64);
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Quantile of an unsorted sample (type 7 interpolation).
pub fn quantile<T: Float>(xs: &[T], p: f64) -> T {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile_sorted(&sorted, p)
}

/// Exponentially weighted volatility of a return series.
///
/// `σ²_t = λ·σ²_{t−1} + (1 − λ)·r²_t`, seeded with the first squared return.
/// RiskMetrics uses λ = 0.94.
pub fn ewma_volatility<T: Float>(returns: &[T], lambda: f64) -> T {
    let l = constant::<T>(lambda);
    let mut iter = returns.iter();
    let Some(&first) = iter.next() else {
        return T::zero();
    };
    let var = iter.fold(first * first, |v, &r| l * v + (T::one() - l) * r * r);
    var.sqrt()
}

/// Standard normal probability density.
#[inline]
pub fn normal_pdf(x: f64) -> f64 {
    const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Complementary error function (Numerical Recipes `erfcc`, |ε| < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Standard normal cumulative distribution function.
///
/// # Examples
///
/// ```
/// use wealth_core::math::statistics::normal_cdf;
///
/// assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((normal_cdf(1.959_963_985) - 0.975).abs() < 1e-6);
/// ```
#[inline]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
///
/// Relative error below 1.2e-9 on (0, 1); returns ±∞ at the end points
/// and NaN outside [0, 1].
///
/// # Examples
///
/// ```
/// use wealth_core::math::statistics::normal_inv_cdf;
///
/// assert!((normal_inv_cdf(0.95) - 1.644_853_627).abs() < 1e-8);
/// assert!((normal_inv_cdf(0.5)).abs() < 1e-12);
/// ```
pub fn normal_inv_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
