//! ARIMA and seasonal ARIMA models estimated by conditional sum of squares.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::arma::{
    ar_lags, ar_polynomial, css_residuals, differencing_polynomial, forecast_recursion,
    forecast_variances, ma_lags, ma_polynomial, poly_mul, psi_weights,
};
use crate::models::arima::diff::{difference, integrate, seasonal_difference, seasonal_integrate};
use crate::models::arima::order::{ModelOrder, SeasonalOrder};
use crate::models::{Forecaster, InformationCriteria};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, z_for_level};

const COEFFICIENT_BOUND: f64 = 0.99;

/// Estimated parameters and in-sample state of a fitted model.
#[derive(Debug, Clone)]
struct FittedState {
    original: Vec<f64>,
    differenced: Vec<f64>,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    /// Full-length residuals on the differenced scale, zero before the lag window.
    innovations: Vec<f64>,
    /// Residuals of the effective sample.
    residuals: Vec<f64>,
    /// In-sample predictions on the original scale, NaN where undefined.
    fitted: Vec<f64>,
    criteria: InformationCriteria,
}

impl FittedState {
    fn ar_poly(&self, period: usize) -> Vec<f64> {
        poly_mul(
            &ar_polynomial(&self.ar, 1),
            &ar_polynomial(&self.seasonal_ar, period),
        )
    }

    fn ma_poly(&self, period: usize) -> Vec<f64> {
        poly_mul(
            &ma_polynomial(&self.ma, 1),
            &ma_polynomial(&self.seasonal_ma, period),
        )
    }
}

/// Shared estimation and forecasting machinery for both families.
#[derive(Debug, Clone)]
struct Estimator {
    order: ModelOrder,
    state: Option<FittedState>,
}

impl Estimator {
    fn new(order: ModelOrder) -> Self {
        Self { order, state: None }
    }

    fn seasonal(&self) -> SeasonalOrder {
        self.order.seasonal.unwrap_or(SeasonalOrder {
            p: 0,
            d: 0,
            q: 0,
            period: 1,
        })
    }

    /// Observations lost to differencing.
    fn differencing_loss(&self) -> usize {
        let s = self.seasonal();
        self.order.d + s.d * s.period
    }

    fn min_observations(&self) -> usize {
        let s = self.seasonal();
        let ar_len = self.order.p + s.p * s.period;
        let ma_len = self.order.q + s.q * s.period;
        self.differencing_loss() + ar_len.max(ma_len) + 2
    }

    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let needed = self.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let s = self.seasonal();
        let seasonally_differenced = seasonal_difference(values, s.d, s.period);
        let differenced = difference(&seasonally_differenced, self.order.d);

        let (p, q) = (self.order.p, self.order.q);
        let (sp, sq) = (s.p, s.q);
        let unpack = |params: &[f64]| {
            let (ar, rest) = params[1..].split_at(p);
            let (ma, rest) = rest.split_at(q);
            let (sar, sma) = rest.split_at(sp);
            (params[0], ar.to_vec(), ma.to_vec(), sar.to_vec(), sma.to_vec())
        };
        let lags_for = |ar: &[f64], ma: &[f64], sar: &[f64], sma: &[f64]| {
            (
                ar_lags(&poly_mul(&ar_polynomial(ar, 1), &ar_polynomial(sar, s.period))),
                ma_lags(&poly_mul(&ma_polynomial(ma, 1), &ma_polynomial(sma, s.period))),
            )
        };

        let n_coefficients = p + q + sp + sq;
        let center = mean(&differenced);
        let params = if n_coefficients == 0 {
            vec![center]
        } else {
            let mut initial = vec![center];
            initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
            initial.extend((0..q).map(|i| 0.1 / (i + 1) as f64));
            initial.extend(std::iter::repeat_n(0.1, sp + sq));

            let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
            bounds.extend(std::iter::repeat_n(
                (-COEFFICIENT_BOUND, COEFFICIENT_BOUND),
                n_coefficients,
            ));

            let result = nelder_mead(
                |params| {
                    let (mu, ar, ma, sar, sma) = unpack(params);
                    let (ar_l, ma_l) = lags_for(&ar, &ma, &sar, &sma);
                    css_residuals(&differenced, mu, &ar_l, &ma_l).1
                },
                &initial,
                Some(&bounds),
                &NelderMeadConfig::default(),
            );

            if !result.optimal_value.is_finite() {
                return Err(ForecastError::FitFailed(
                    "objective is not finite at the optimum".to_string(),
                ));
            }
            result.optimal_point
        };

        if params.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::FitFailed(
                "non-finite parameters".to_string(),
            ));
        }

        let (intercept, ar, ma, seasonal_ar, seasonal_ma) = unpack(&params);
        let (ar_l, ma_l) = lags_for(&ar, &ma, &seasonal_ar, &seasonal_ma);
        let (innovations, css) = css_residuals(&differenced, intercept, &ar_l, &ma_l);

        let start = ar_l.len().max(ma_l.len());
        let n_eff = differenced.len().saturating_sub(start);
        if n_eff == 0 {
            return Err(ForecastError::InsufficientData {
                needed: self.min_observations(),
                got: values.len(),
            });
        }

        let sigma2 = css / n_eff as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::FitFailed(
                "residual variance is not finite".to_string(),
            ));
        }

        // Floor avoids ln(0) on a perfect fit
        let floored = sigma2.max(f64::EPSILON);
        let k = (n_coefficients + 1) as f64;
        let n = n_eff as f64;
        let log_likelihood = -0.5 * n * (1.0 + floored.ln() + (2.0 * std::f64::consts::PI).ln());
        let criteria = InformationCriteria {
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * n.ln(),
            sigma2,
        };

        let offset = self.differencing_loss();
        let mut fitted = vec![f64::NAN; values.len()];
        for t in start..differenced.len() {
            fitted[t + offset] = values[t + offset] - innovations[t];
        }

        self.state = Some(FittedState {
            original: values.to_vec(),
            residuals: innovations[start..].to_vec(),
            differenced,
            intercept,
            ar,
            ma,
            seasonal_ar,
            seasonal_ma,
            innovations,
            fitted,
            criteria,
        });

        Ok(())
    }

    fn state(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(ForecastError::FitRequired)
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state()?;
        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let s = self.seasonal();
        let ar_l = ar_lags(&state.ar_poly(s.period));
        let ma_l = ma_lags(&state.ma_poly(s.period));

        let forecast_diff = forecast_recursion(
            &state.differenced,
            &state.innovations,
            state.intercept,
            &ar_l,
            &ma_l,
            horizon,
        );

        let seasonally_differenced = seasonal_difference(&state.original, s.d, s.period);
        let regular = integrate(&forecast_diff, &seasonally_differenced, self.order.d);
        let predictions = seasonal_integrate(&regular, &state.original, s.d, s.period);

        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {level}"
            )));
        }

        let forecast = self.predict(horizon)?;
        if horizon == 0 {
            return Ok(forecast);
        }

        let state = self.state()?;
        let s = self.seasonal();
        let full_ar = poly_mul(
            &poly_mul(&state.ar_poly(s.period), &differencing_polynomial(self.order.d, 1)),
            &differencing_polynomial(s.d, s.period),
        );
        let psi = psi_weights(&full_ar, &state.ma_poly(s.period), horizon);
        let variances = forecast_variances(state.criteria.sigma2, &psi);

        let z = z_for_level(level);
        let preds = forecast.primary();
        let (lower, upper) = preds
            .iter()
            .zip(&variances)
            .map(|(p, v)| {
                let half = z * v.sqrt();
                (p - half, p + half)
            })
            .unzip();

        Ok(Forecast::from_values_with_intervals(
            preds.to_vec(),
            lower,
            upper,
        ))
    }
}

/// Non-seasonal ARIMA(p, d, q) model.
///
/// Differences the series `d` times and fits an intercept plus AR and MA
/// coefficients by minimizing the conditional sum of squares.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use pricecast::core::TimeSeries;
/// use pricecast::models::{arima::ARIMA, Forecaster};
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps = (0..40).map(|i| base + Duration::days(i)).collect();
/// let values = (0..40).map(|i| 100.0 + i as f64 + (i as f64 * 0.7).sin()).collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let mut model = ARIMA::new(1, 1, 0);
/// model.fit(&series).unwrap();
/// let forecast = model.predict_with_intervals(5, 0.95).unwrap();
/// assert_eq!(forecast.horizon(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ARIMA {
    inner: Estimator,
}

impl ARIMA {
    /// Create a new ARIMA model.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            inner: Estimator::new(ModelOrder::new(p, d, q)),
        }
    }

    /// The model order.
    pub fn order(&self) -> ModelOrder {
        self.inner.order
    }

    /// Get AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        self.inner.state.as_ref().map(|s| s.ar.as_slice()).unwrap_or(&[])
    }

    /// Get MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        self.inner.state.as_ref().map(|s| s.ma.as_slice()).unwrap_or(&[])
    }

    /// Mean of the differenced series.
    pub fn intercept(&self) -> f64 {
        self.inner.state.as_ref().map_or(0.0, |s| s.intercept)
    }

    /// Get AIC.
    pub fn aic(&self) -> Option<f64> {
        self.inner.state.as_ref().map(|s| s.criteria.aic)
    }

    /// Get BIC.
    pub fn bic(&self) -> Option<f64> {
        self.inner.state.as_ref().map(|s| s.criteria.bic)
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.inner.fit(series)
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.inner.predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.inner.predict_with_intervals(horizon, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.inner.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.inner.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn information_criteria(&self) -> Option<InformationCriteria> {
        self.inner.state.as_ref().map(|s| s.criteria)
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}

/// Seasonal ARIMA(p, d, q)(P, D, Q)\[s\] model.
///
/// The series is seasonally differenced `D` times at lag `s`, then
/// differenced `d` times. AR and MA parts are multiplicative:
/// `φ(B)Φ(B^s)` and `θ(B)Θ(B^s)`.
#[derive(Debug, Clone)]
pub struct SARIMA {
    inner: Estimator,
}

impl SARIMA {
    /// Create a new SARIMA model.
    pub fn new(p: usize, d: usize, q: usize, seasonal: SeasonalOrder) -> Self {
        Self {
            inner: Estimator::new(ModelOrder::new(p, d, q).with_seasonal(seasonal)),
        }
    }

    /// The model order.
    pub fn order(&self) -> ModelOrder {
        self.inner.order
    }

    /// Seasonal AR coefficients.
    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        self.inner.state.as_ref().map(|s| s.seasonal_ar.as_slice()).unwrap_or(&[])
    }

    /// Seasonal MA coefficients.
    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        self.inner.state.as_ref().map(|s| s.seasonal_ma.as_slice()).unwrap_or(&[])
    }

    /// Get AIC.
    pub fn aic(&self) -> Option<f64> {
        self.inner.state.as_ref().map(|s| s.criteria.aic)
    }
}

impl Forecaster for SARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.inner.fit(series)
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.inner.predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.inner.predict_with_intervals(horizon, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.inner.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.inner.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn information_criteria(&self) -> Option<InformationCriteria> {
        self.inner.state.as_ref().map(|s| s.criteria)
    }

    fn name(&self) -> &str {
        "SARIMA"
    }
}
