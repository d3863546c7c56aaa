//! Residual diagnostics for fitted models.
//!
//! A well-specified model leaves residuals that look like white noise. The
//! Ljung-Box portmanteau test checks the first few autocorrelations jointly.

use serde::{Deserialize, Serialize};

use crate::utils::stats::{mean, population_std_dev};

/// Lags tested by [`ResidualDiagnostics::from_residuals`].
pub const LJUNG_BOX_LAGS: usize = 10;

/// Residual mean magnitude below which residuals count as centered.
const CENTERED_MEAN: f64 = 0.1;

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-15;
const TINY: f64 = 1e-300;

/// Outcome of a Ljung-Box test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LjungBox {
    /// The Q statistic.
    pub statistic: f64,
    /// Upper tail probability of Q under the white-noise hypothesis.
    pub p_value: f64,
    pub lags: usize,
    /// Degrees of freedom of the reference chi-squared distribution.
    pub df: usize,
}

impl LjungBox {
    /// True when white noise is not rejected at significance `alpha`.
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box test over `lags` autocorrelations of `residuals`.
///
/// `fitted_params` is subtracted from `lags` for the degrees of freedom (at
/// least one is kept). Returns `None` for fewer than three residuals or any
/// non-finite residual. Constant residuals give `Q = 0` and `p = 1`.
pub fn ljung_box(residuals: &[f64], lags: usize, fitted_params: usize) -> Option<LjungBox> {
    let n = residuals.len();
    if n < 3 || residuals.iter().any(|r| !r.is_finite()) {
        return None;
    }

    let lags = lags.clamp(1, n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let center = mean(residuals);
    let centered: Vec<f64> = residuals.iter().map(|r| r - center).collect();
    let total: f64 = centered.iter().map(|c| c * c).sum();
    if total == 0.0 {
        return Some(LjungBox {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            df,
        });
    }

    let weighted: f64 = (1..=lags)
        .map(|k| {
            let acf = centered[k..]
                .iter()
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / total;
            acf * acf / (n - k) as f64
        })
        .sum();
    let nf = n as f64;
    let statistic = nf * (nf + 2.0) * weighted;

    Some(LjungBox {
        statistic,
        p_value: chi_squared_sf(statistic, df),
        lags,
        df,
    })
}

/// Summary of in-sample residuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub ljung_box: LjungBox,
    /// `|mean| < 0.1`.
    pub centered: bool,
}

impl ResidualDiagnostics {
    /// Diagnose `residuals` with a Ljung-Box test at [`LJUNG_BOX_LAGS`] lags.
    pub fn from_residuals(residuals: &[f64]) -> Option<Self> {
        let ljung_box = ljung_box(residuals, LJUNG_BOX_LAGS, 0)?;
        let mean = mean(residuals);
        Some(Self {
            mean,
            std_dev: population_std_dev(residuals),
            ljung_box,
            centered: mean.abs() < CENTERED_MEAN,
        })
    }
}

/// `P(X > x)` for a chi-squared variable with `df` degrees of freedom.
pub fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if df == 0 || x <= 0.0 {
        return 1.0;
    }
    if x.is_infinite() {
        return 0.0;
    }
    regularized_gamma_q(df as f64 / 2.0, x / 2.0)
}

/// Regularized upper incomplete gamma `Q(a, x)` for `a > 0`, `x > 0`.
fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    let log_prefactor = a * x.ln() - x - ln_gamma(a);

    if x < a + 1.0 {
        // Series for P(a, x)
        let mut term = 1.0 / a;
        let mut sum = term;
        let mut denom = a;
        for _ in 0..MAX_ITERATIONS {
            denom += 1.0;
            term *= x / denom;
            sum += term;
            if term.abs() < sum.abs() * TOLERANCE {
                break;
            }
        }
        (1.0 - sum * log_prefactor.exp()).clamp(0.0, 1.0)
    } else {
        // Continued fraction for Q(a, x), modified Lentz
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITERATIONS {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < TINY {
                d = TINY;
            }
            c = b + an / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            let step = d * c;
            h *= step;
            if (step - 1.0).abs() < TOLERANCE {
                break;
            }
        }
        (log_prefactor.exp() * h).clamp(0.0, 1.0)
    }
}

/// Lanczos approximation (g = 7) of `ln Γ(x)` for `x >= 0.5`.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    let z = x - 1.0;
    let series = COEFFICIENTS[1..]
        .iter()
        .enumerate()
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (z + i as f64 + 1.0));
    let t = z + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (z + 0.5) * t.ln() - t + series.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeSeries;
    use crate::models::arima::ARIMA;
    use crate::models::fit_model;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Approximately standard normal draws from a fixed-seed LCG.
    fn gaussian_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        let mut uniform = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n)
            .map(|_| (0..12).map(|_| uniform()).sum::<f64>() - 6.0)
            .collect()
    }

    fn ar1(noise: &[f64], phi: f64) -> Vec<f64> {
        let mut level = 0.0;
        let mut out = Vec::with_capacity(noise.len());
        out.push(level);
        for e in &noise[1..] {
            level = phi * level + e;
            out.push(level);
        }
        out
    }

    fn make_series(values: &[f64]) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| base + Duration::days(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values.to_vec()).unwrap()
    }

    #[test]
    fn ln_gamma_known_values() {
        assert_relative_eq!(ln_gamma(1.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), epsilon = 1e-12);
    }

    #[test]
    fn chi_squared_tail_known_values() {
        // Two degrees of freedom: P(X > x) = exp(-x / 2)
        assert_relative_eq!(chi_squared_sf(2.0, 2), (-1.0_f64).exp(), epsilon = 1e-10);
        assert_relative_eq!(chi_squared_sf(10.0, 2), (-5.0_f64).exp(), epsilon = 1e-10);
        // 95th percentile of chi-squared(10)
        assert_relative_eq!(chi_squared_sf(18.307, 10), 0.05, epsilon = 1e-4);
        assert_relative_eq!(chi_squared_sf(3.841_459, 1), 0.05, epsilon = 1e-5);
        assert_eq!(chi_squared_sf(0.0, 3), 1.0);
        assert_eq!(chi_squared_sf(f64::INFINITY, 3), 0.0);
    }

    #[test]
    fn white_noise_passes_and_ar1_fails() {
        let noise = gaussian_noise(200, 42);
        let white = ljung_box(&noise, 10, 0).unwrap();
        assert_eq!((white.lags, white.df), (10, 10));
        assert!(white.is_white_noise(0.05), "{white:?}");

        let correlated = ljung_box(&ar1(&noise, 0.7), 10, 0).unwrap();
        assert!(correlated.statistic > 50.0);
        assert!(!correlated.is_white_noise(0.05), "{correlated:?}");
    }

    #[test]
    fn degenerate_inputs() {
        assert!(ljung_box(&[1.0, 2.0], 10, 0).is_none());
        assert!(ljung_box(&[1.0, f64::NAN, 2.0, 3.0], 2, 0).is_none());

        let flat = ljung_box(&[3.0; 20], 5, 0).unwrap();
        assert_eq!((flat.statistic, flat.p_value), (0.0, 1.0));

        // Lags capped at n - 1, df never below one
        let short = ljung_box(&[1.0, -1.0, 2.0, 0.5], 10, 5).unwrap();
        assert_eq!((short.lags, short.df), (3, 1));
    }

    #[test]
    fn fitted_residuals_are_diagnosed() {
        let noise = gaussian_noise(200, 42);

        let mut model = ARIMA::new(0, 0, 0);
        let fit = fit_model(&mut model, &make_series(&noise), 5, 0.95).unwrap();
        let diagnostics = fit.diagnostics().unwrap();
        assert_eq!(diagnostics.ljung_box.lags, LJUNG_BOX_LAGS);
        assert!(diagnostics.ljung_box.is_white_noise(0.05));
        assert!(diagnostics.centered);
        assert!(diagnostics.std_dev > 0.5 && diagnostics.std_dev < 1.5);

        // An order-0 model leaves the AR(1) structure in its residuals
        let mut model = ARIMA::new(0, 0, 0);
        let fit = fit_model(&mut model, &make_series(&ar1(&noise, 0.7)), 5, 0.95).unwrap();
        let diagnostics = fit.diagnostics().unwrap();
        assert!(!diagnostics.ljung_box.is_white_noise(0.05));
        assert!(diagnostics.ljung_box.p_value < 1e-6);
    }
}
