//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::diagnostics::ResidualDiagnostics;
use serde::{Deserialize, Serialize};

/// Goodness-of-fit summary of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    /// Akaike information criterion.
    pub aic: f64,
    /// Bayesian information criterion.
    pub bic: f64,
    /// Residual variance of the innovations.
    pub sigma2: f64,
}

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with confidence intervals.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let _ = level;
        self.predict(horizon)
    }

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Information criteria of the last fit, if the model computes them.
    fn information_criteria(&self) -> Option<InformationCriteria> {
        None
    }

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// Members are `Send` so a whole request can move to a worker thread.
///
/// # Example
///
/// ```
/// use pricecast::models::{BoxedForecaster, Forecaster};
/// use pricecast::models::fallback::DampedTrendNaive;
///
/// let model: BoxedForecaster = Box::new(DampedTrendNaive::new());
/// assert_eq!(model.name(), "DampedTrendNaive");
/// ```
pub type BoxedForecaster = Box<dyn Forecaster + Send>;

/// Everything a single fit-and-forecast produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    /// Name of the model family that produced the fit.
    pub model: String,
    /// Out-of-sample forecast with interval bounds.
    pub forecast: Forecast,
    /// In-sample residuals.
    pub residuals: Vec<f64>,
    /// Information criteria, when the family computes them.
    pub criteria: Option<InformationCriteria>,
}

impl ModelFit {
    /// Residual mean, spread and Ljung-Box test, when there are enough residuals.
    pub fn diagnostics(&self) -> Option<ResidualDiagnostics> {
        ResidualDiagnostics::from_residuals(&self.residuals)
    }
}

/// Fit `model` on `series` and forecast `horizon` steps at `level`.
///
/// Any failure comes back as an error value; the caller decides whether to
/// fall back. Predictions that are not finite are reported as
/// [`ForecastError::FitFailed`].
pub fn fit_model(
    model: &mut dyn Forecaster,
    series: &TimeSeries,
    horizon: usize,
    level: f64,
) -> Result<ModelFit> {
    model.fit(series)?;
    let forecast = model.predict_with_intervals(horizon, level)?;
    if !forecast.is_finite() {
        return Err(ForecastError::FitFailed(format!(
            "{} produced non-finite predictions",
            model.name()
        )));
    }

    Ok(ModelFit {
        model: model.name().to_string(),
        forecast,
        residuals: model.residuals().map(<[f64]>::to_vec).unwrap_or_default(),
        criteria: model.information_criteria(),
    })
}
