//! Statistical primitives shared by the plausibility evaluators.
//!
//! All approximations are closed-form: the error function uses the
//! Abramowitz-Stegun polynomial, the chi-squared tail uses the
//! Wilson-Hilferty cube-root transform, and the Kolmogorov distribution
//! uses its alternating-series expansion. Accuracy is in the 1e-7 range,
//! far tighter than the 0.05-style thresholds these tests gate on.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation around `center`.
pub fn mad(sorted: &[f64], center: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - center).abs()).collect();
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    median(&deviations)
}

/// Linear-interpolated quantile of pre-sorted data, `q` in `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = position - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Abramowitz-Stegun polynomial approximation of the error function.
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Tail probability of the Kolmogorov distribution,
/// `P(D > z) = 2 * sum_{k>=1} (-1)^(k-1) exp(-2 k^2 z^2)`.
pub fn kolmogorov_p_value(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z > 3.0 {
        return 0.0;
    }
    let z_sq = z * z;
    let mut p = 0.0;
    for k in 1..=100 {
        let k_f = f64::from(k);
        let term = (-1.0_f64).powi(k - 1) * (-2.0 * k_f * k_f * z_sq).exp();
        p += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// One-sample Kolmogorov-Smirnov test against a theoretical CDF.
/// Returns `(d_statistic, p_value)`.
pub fn ks_test_one_sample<F>(sorted: &[f64], cdf: F) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let n = sorted.len();
    if n == 0 {
        return (0.0, 1.0);
    }
    let mut d_statistic = 0.0_f64;
    for (i, &x) in sorted.iter().enumerate() {
        let theoretical = cdf(x);
        let empirical_above = (i + 1) as f64 / n as f64;
        let empirical_below = i as f64 / n as f64;
        d_statistic = d_statistic
            .max((empirical_above - theoretical).abs())
            .max((theoretical - empirical_below).abs());
    }
    let en = (n as f64).sqrt();
    let p_value = kolmogorov_p_value(d_statistic * (en + 0.12 + 0.11 / en));
    (d_statistic, p_value)
}

/// Chi-squared tail probability via the Wilson-Hilferty transform.
pub fn chi_squared_p_value(chi_sq: f64, df: usize) -> f64 {
    if df == 0 {
        return 1.0;
    }
    let k = df as f64;
    let z = ((chi_sq / k).cbrt() - (1.0 - 2.0 / (9.0 * k))) / (2.0 / (9.0 * k)).sqrt();
    1.0 - standard_normal_cdf(z)
}

/// Goodness-of-fit chi-squared statistic for observed counts against
/// expected probabilities. Returns `(chi_sq, df)`.
pub fn chi_squared_statistic(observed: &[(f64, f64)]) -> (f64, usize) {
    let mut chi_sq = 0.0;
    let mut df = 0usize;
    for &(observed_count, expected_count) in observed {
        if expected_count > 0.0 {
            chi_sq += (observed_count - expected_count).powi(2) / expected_count;
            df += 1;
        }
    }
    (chi_sq, df.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erf_matches_known_values() {
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_8).abs() < 1e-4);
        assert!((erf(-1.0) + 0.842_700_8).abs() < 1e-4);
    }

    #[test]
    fn normal_cdf_is_symmetric() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
        let upper = standard_normal_cdf(1.96);
        assert!((upper - 0.975).abs() < 1e-3);
        assert!((standard_normal_cdf(-1.96) - (1.0 - upper)).abs() < 1e-9);
    }

    #[test]
    fn quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
        assert!((quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn median_and_mad() {
        let sorted = [1.0, 2.0, 3.0, 100.0];
        assert!((median(&sorted) - 2.5).abs() < 1e-12);
        let m = median(&sorted);
        assert!(mad(&sorted, m) > 0.0);
    }

    #[test]
    fn ks_accepts_matching_distribution() {
        // Evenly spaced points on [0, 1] against the uniform CDF.
        let sorted: Vec<f64> = (1..=200).map(|i| f64::from(i) / 201.0).collect();
        let (d, p) = ks_test_one_sample(&sorted, |x| x.clamp(0.0, 1.0));
        assert!(d < 0.05, "d = {d}");
        assert!(p > 0.5, "p = {p}");
    }

    #[test]
    fn ks_rejects_shifted_distribution() {
        // Everything piled in [0, 0.2] against the uniform CDF on [0, 1].
        let sorted: Vec<f64> = (1..=200).map(|i| f64::from(i) / 1000.0).collect();
        let (_, p) = ks_test_one_sample(&sorted, |x| x.clamp(0.0, 1.0));
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn chi_squared_tail_behaves() {
        // Statistic equal to df sits near the bulk of the distribution.
        assert!(chi_squared_p_value(5.0, 5) > 0.3);
        // A huge statistic is far in the tail.
        assert!(chi_squared_p_value(100.0, 5) < 1e-6);
        assert_eq!(chi_squared_p_value(10.0, 0), 1.0);
    }
}
