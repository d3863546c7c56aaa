//! ARMA kernels shared by the ARIMA and SARIMA families.
//!
//! Lag polynomials are stored with their constant term, so `[1.0, -0.5]`
//! is `1 - 0.5B`. Multiplicative seasonal models are handled by expanding
//! `φ(B)Φ(B^s)` and `θ(B)Θ(B^s)` into plain lag coefficients; the
//! recursions below never need to know about seasonality.

/// Multiply two lag polynomials.
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `1 - c_1 B^stride - c_2 B^(2 stride) - ...`
pub fn ar_polynomial(coefficients: &[f64], stride: usize) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * stride + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * stride] = -c;
    }
    poly
}

/// `1 + c_1 B^stride + c_2 B^(2 stride) + ...`
pub fn ma_polynomial(coefficients: &[f64], stride: usize) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * stride + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * stride] = *c;
    }
    poly
}

/// `(1 - B^stride)^order`
pub fn differencing_polynomial(order: usize, stride: usize) -> Vec<f64> {
    (0..order).fold(vec![1.0], |acc, _| poly_mul(&acc, &ar_polynomial(&[1.0], stride)))
}

/// Lag coefficients `a_k` such that `w_t = Σ a_k w_{t-k} + ...`.
pub fn ar_lags(poly: &[f64]) -> Vec<f64> {
    poly.iter().skip(1).map(|c| -c).collect()
}

/// Lag coefficients `m_k` such that `w_t = e_t + Σ m_k e_{t-k} + ...`.
pub fn ma_lags(poly: &[f64]) -> Vec<f64> {
    poly.iter().skip(1).copied().collect()
}

/// Conditional residuals of a mean-`mu` ARMA process.
///
/// Residuals before the first full lag window are zero. Returns the
/// residual vector and the conditional sum of squares.
pub fn css_residuals(series: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> (Vec<f64>, f64) {
    let n = series.len();
    let start = ar.len().max(ma.len());
    let mut residuals = vec![0.0; n];
    let mut css = 0.0;

    for t in start..n {
        let pred = one_step(series, &residuals, t, mu, ar, ma);
        let error = series[t] - pred;
        residuals[t] = error;
        css += error * error;
    }

    (residuals, css)
}

#[inline]
fn one_step(series: &[f64], residuals: &[f64], t: usize, mu: f64, ar: &[f64], ma: &[f64]) -> f64 {
    let mut pred = mu;
    for (k, a) in ar.iter().enumerate() {
        if *a != 0.0 && t > k {
            pred += a * (series[t - 1 - k] - mu);
        }
    }
    for (k, m) in ma.iter().enumerate() {
        if *m != 0.0 && t > k {
            pred += m * residuals[t - 1 - k];
        }
    }
    pred
}

/// Extend `series` by `horizon` steps with future shocks set to zero.
pub fn forecast_recursion(
    series: &[f64],
    residuals: &[f64],
    mu: f64,
    ar: &[f64],
    ma: &[f64],
    horizon: usize,
) -> Vec<f64> {
    let mut extended = series.to_vec();
    let mut shocks = residuals.to_vec();

    for _ in 0..horizon {
        let t = extended.len();
        let pred = one_step(&extended, &shocks, t, mu, ar, ma);
        extended.push(pred);
        shocks.push(0.0);
    }

    extended.split_off(series.len())
}

/// MA(∞) weights `ψ_0 .. ψ_{horizon-1}` of `ar_poly(B) x_t = ma_poly(B) e_t`.
///
/// `ar_poly` must include every differencing factor so the weights describe
/// the undifferenced series.
pub fn psi_weights(ar_poly: &[f64], ma_poly: &[f64], horizon: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(horizon);
    for j in 0..horizon {
        let mut value = ma_poly.get(j).copied().unwrap_or(0.0);
        for i in 1..=j.min(ar_poly.len().saturating_sub(1)) {
            value -= ar_poly[i] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

/// Forecast-error variance at each step `h = 1..=horizon`.
///
/// Non-decreasing in `h` because every step adds a squared weight.
pub fn forecast_variances(sigma2: f64, psi: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    psi.iter()
        .map(|w| {
            acc += w * w;
            sigma2 * acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn seasonal_ar_expands_multiplicatively() {
        // (1 - 0.5B)(1 - 0.4B^4) = 1 - 0.5B - 0.4B^4 + 0.2B^5
        let poly = poly_mul(&ar_polynomial(&[0.5], 1), &ar_polynomial(&[0.4], 4));
        assert_eq!(poly.len(), 6);
        let lags = ar_lags(&poly);
        assert_relative_eq!(lags[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(lags[3], 0.4, epsilon = 1e-12);
        assert_relative_eq!(lags[4], -0.2, epsilon = 1e-12);
        assert_eq!(lags[1], 0.0);
    }

    #[test]
    fn differencing_polynomial_coefficients() {
        assert_eq!(differencing_polynomial(0, 1), vec![1.0]);
        assert_eq!(differencing_polynomial(2, 1), vec![1.0, -2.0, 1.0]);
        assert_eq!(differencing_polynomial(1, 3), vec![1.0, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn css_is_zero_for_exact_ar1() {
        let mut series = vec![1.0];
        for t in 1..20 {
            series.push(0.5 * series[t - 1]);
        }
        let (residuals, css) = css_residuals(&series, 0.0, &[0.5], &[]);
        assert_relative_eq!(css, 0.0, epsilon = 1e-20);
        assert_eq!(residuals[0], 0.0);
    }

    #[test]
    fn forecast_recursion_decays_to_mean() {
        let series = vec![10.0, 12.0];
        let out = forecast_recursion(&series, &[0.0, 0.0], 10.0, &[0.5], &[], 3);
        assert_relative_eq!(out[0], 11.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 10.5, epsilon = 1e-12);
        assert_relative_eq!(out[2], 10.25, epsilon = 1e-12);
    }

    #[test]
    fn forecast_recursion_uses_last_shock_once() {
        let out = forecast_recursion(&[0.0, 1.0], &[0.0, 1.0], 0.0, &[], &[0.3], 2);
        assert_relative_eq!(out[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn psi_weights_of_random_walk_are_ones() {
        let psi = psi_weights(&differencing_polynomial(1, 1), &[1.0], 4);
        assert_eq!(psi, vec![1.0; 4]);

        let var = forecast_variances(2.0, &psi);
        assert_eq!(var, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn psi_weights_of_ar1() {
        let psi = psi_weights(&ar_polynomial(&[0.5], 1), &[1.0], 4);
        assert_relative_eq!(psi[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(psi[3], 0.125, epsilon = 1e-12);
    }

    #[test]
    fn psi_weights_of_ma1() {
        let psi = psi_weights(&[1.0], &ma_polynomial(&[0.4], 1), 3);
        assert_eq!(psi, vec![1.0, 0.4, 0.0]);
    }
}
