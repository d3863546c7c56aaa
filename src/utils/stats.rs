//! Statistical utility functions.

/// Approximate quantile function for standard normal distribution.
///
/// Uses the Abramowitz and Stegun approximation (formula 26.2.23).
///
/// # Example
/// ```
/// use pricecast::utils::quantile_normal;
///
/// // 95% two-sided level -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let t = if p < 0.5 {
        (-2.0 * p.ln()).sqrt()
    } else {
        (-2.0 * (1.0 - p).ln()).sqrt()
    };

    let (c0, c1, c2) = (2.515517, 0.802853, 0.010328);
    let (d1, d2, d3) = (1.432788, 0.189269, 0.001308);

    let result = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    if p < 0.5 {
        -result
    } else {
        result
    }
}

/// Two-sided z multiplier for a confidence level in (0, 1).
pub fn z_for_level(level: f64) -> f64 {
    quantile_normal((1.0 + level) / 2.0)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the sample standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Standard deviation with an n denominator.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Simple returns `x[i] / x[i-1] - 1`; one element shorter than the input.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Trailing rolling mean.
///
/// Positions before the first full window are NaN, as is any window that
/// contains a NaN.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; series.len()];
    if window == 0 {
        return result;
    }
    for end in window..=series.len() {
        result[end - 1] = mean(&series[end - window..end]);
    }
    result
}

/// Exponentially weighted mean seeded with the first value.
///
/// `alpha` is clamped to `[0, 1]`; a span of `s` periods is `alpha = 2 / (s + 1)`.
pub fn ewm_mean(series: &[f64], alpha: f64) -> Vec<f64> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut result = Vec::with_capacity(series.len());
    let mut level = match series.first() {
        Some(&first) => first,
        None => return result,
    };
    result.push(level);
    for &x in &series[1..] {
        level = alpha * x + (1.0 - alpha) * level;
        result.push(level);
    }
    result
}

/// Trailing rolling sample standard deviation.
///
/// Positions before the first full window are NaN, as is any window that
/// contains a NaN.
pub fn rolling_std(series: &[f64], window: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; series.len()];
    if window < 2 {
        return result;
    }
    for end in window..=series.len() {
        result[end - 1] = std_dev(&series[end - window..end]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 0.01);
        assert_relative_eq!(quantile_normal(0.975), 1.96, epsilon = 0.01);
        assert_relative_eq!(quantile_normal(0.025), -1.96, epsilon = 0.01);
        assert_relative_eq!(quantile_normal(0.995), 2.576, epsilon = 0.01);
    }

    #[test]
    fn quantile_normal_boundary_values() {
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn z_for_level_matches_two_sided_quantile() {
        assert_relative_eq!(z_for_level(0.95), 1.96, epsilon = 0.01);
        assert_relative_eq!(z_for_level(0.80), 1.2816, epsilon = 0.01);
    }

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[10.0]), 10.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variance_calculates_correctly() {
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
        assert!(variance(&[]).is_nan());
    }

    #[test]
    fn std_dev_sample_and_population() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(std_dev(&values), 2.5_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(population_std_dev(&values), 2.0_f64.sqrt(), epsilon = 1e-10);
        // Two members: population std is half the gap
        assert_relative_eq!(population_std_dev(&[10.0, 14.0]), 2.0, epsilon = 1e-12);
        assert!(population_std_dev(&[]).is_nan());
    }

    #[test]
    fn median_calculates_correctly() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn pct_changes_are_simple_returns() {
        let returns = pct_changes(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
        assert!(pct_changes(&[1.0]).is_empty());
    }

    #[test]
    fn rolling_mean_is_trailing() {
        let rolled = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(rolled[0].is_nan());
        assert_relative_eq!(rolled[1], 1.5, epsilon = 1e-12);
        assert_relative_eq!(rolled[3], 3.5, epsilon = 1e-12);
        assert!(rolling_mean(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
        assert!(rolling_mean(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ewm_mean_known_values() {
        let smoothed = ewm_mean(&[1.0, 2.0, 3.0], 0.5);
        assert_eq!(smoothed, vec![1.0, 1.5, 2.25]);
        assert_eq!(ewm_mean(&[4.0, 8.0], 1.0), vec![4.0, 8.0]);
        assert!(ewm_mean(&[], 0.3).is_empty());
    }

    #[test]
    fn rolling_std_is_trailing_and_nan_aware() {
        let series = [f64::NAN, 1.0, 3.0, 5.0, 5.0];
        let rolled = rolling_std(&series, 2);

        assert!(rolled[0].is_nan());
        assert!(rolled[1].is_nan());
        assert_relative_eq!(rolled[2], 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(rolled[4], 0.0, epsilon = 1e-12);
        assert!(rolling_std(&series, 1).iter().all(|v| v.is_nan()));
        assert!(rolling_std(&series, 9).iter().all(|v| v.is_nan()));
    }
}
