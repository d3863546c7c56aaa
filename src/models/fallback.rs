//! Damped-trend naive forecaster used when the ensemble cannot be fitted.
//!
//! The point path starts at the last observation and drifts by a tenth of the
//! gap between that observation and the short trailing average. The band is a
//! fixed ~95% envelope from the series' own standard deviation.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::stats::{mean, std_dev};

/// Observations in the trailing average.
const TRAILING_WINDOW: usize = 5;
/// Divisor applied to the last-minus-average gap.
const DAMPING: f64 = 10.0;
/// Half-width of the band in standard deviations.
const BAND_Z: f64 = 1.96;

#[derive(Debug, Clone)]
struct State {
    last: f64,
    trend: f64,
    std_dev: f64,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
}

/// Naive forecaster with a damped trend; cannot fail on finite input.
#[derive(Debug, Clone, Default)]
pub struct DampedTrendNaive {
    state: Option<State>,
}

impl State {
    fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let last = finite.last().copied().unwrap_or(0.0);
        let tail = &finite[finite.len().saturating_sub(TRAILING_WINDOW)..];
        let trend = if tail.is_empty() {
            0.0
        } else {
            (last - mean(tail)) / DAMPING
        };
        let spread = if finite.len() < 2 { 0.0 } else { std_dev(&finite) };

        let mut fitted = Vec::with_capacity(finite.len());
        let mut residuals = Vec::with_capacity(finite.len());
        for (i, &v) in finite.iter().enumerate() {
            if i == 0 {
                fitted.push(f64::NAN);
                residuals.push(f64::NAN);
            } else {
                fitted.push(finite[i - 1]);
                residuals.push(v - finite[i - 1]);
            }
        }

        Self {
            last,
            trend,
            std_dev: spread,
            fitted,
            residuals,
        }
    }

    fn band(&self, horizon: usize) -> Forecast {
        let half = BAND_Z * self.std_dev;

        let point: Vec<f64> = (0..horizon)
            .map(|i| self.last + self.trend * (i + 1) as f64)
            .collect();
        let lower = point.iter().map(|p| p - half).collect();
        let upper = point.iter().map(|p| p + half).collect();

        Forecast::from_values_with_intervals(point, lower, upper)
    }
}

/// Damped-trend forecast of `values` with its band, plus the standard
/// deviation behind the band. Never fails.
pub fn project(values: &[f64], horizon: usize) -> (Forecast, f64) {
    let state = State::from_values(values);
    (state.band(horizon), state.std_dev)
}

impl DampedTrendNaive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit directly on raw values. Non-finite values are ignored; an empty
    /// history behaves like a flat series at zero.
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            state: Some(State::from_values(values)),
        }
    }

    /// Per-step drift of the point path.
    pub fn trend(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.trend)
    }

    /// Standard deviation behind the band.
    pub fn std_dev(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.std_dev)
    }

    fn band(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(ForecastError::FitRequired)?;
        Ok(state.band(horizon))
    }
}

impl Forecaster for DampedTrendNaive {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        *self = Self::from_values(series.values());
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let forecast = self.band(horizon)?;
        Ok(Forecast::from_values(forecast.primary().to_vec()))
    }

    /// The band is always the fixed ~95% envelope; `level` is ignored.
    fn predict_with_intervals(&self, horizon: usize, _level: f64) -> Result<Forecast> {
        self.band(horizon)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn name(&self) -> &str {
        "DampedTrendNaive"
    }
}
