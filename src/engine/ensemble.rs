//! Two-member ensemble of a trend-only ARIMA and a seasonal SARIMA.

use chrono::{DateTime, Duration, Utc};

use crate::config::ForecastSettings;
use crate::core::{Forecast, ForecastPoint, LiveQuote, TimeSeries};
use crate::engine::backtest::{backtest, BacktestMetrics};
use crate::engine::confidence::{
    annualized_volatility, confidence_score, interval_width_pct, ConfidenceScore,
};
use crate::engine::report::{ForecastMethod, TrendSummary};
use crate::error::{ForecastError, Result};
use crate::models::arima::{ModelOrder, ModelOrders};
use crate::models::{fallback, fit_model, ModelFit};
use crate::utils::stats::population_std_dev;

/// Result of one ensemble run, before it is wrapped into a report.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutcome {
    pub points: Vec<ForecastPoint>,
    pub method: ForecastMethod,
    pub orders: ModelOrders,
    pub metrics: Option<BacktestMetrics>,
    pub confidence: ConfidenceScore,
    /// Annualized volatility of the prepared series, in percent.
    pub volatility: f64,
    pub interval_width_pct: f64,
    pub trend: TrendSummary,
    /// The gap-filled, windowed series the members were fitted on.
    pub history: TimeSeries,
    /// Price the trend is measured against.
    pub reference: LiveQuote,
}

/// Fits both members and averages them, falling back to a damped-trend naive
/// forecast whenever the ensemble cannot be produced.
#[derive(Debug, Clone, Default)]
pub struct EnsembleForecaster {
    settings: ForecastSettings,
}

impl EnsembleForecaster {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Forecast `horizon` steps past the end of `history`.
    ///
    /// `live`, when given, is appended as the newest observation. Input
    /// errors are returned; model failures are absorbed by the fallback.
    pub fn forecast(
        &self,
        history: &TimeSeries,
        live: Option<LiveQuote>,
        orders: &ModelOrders,
        horizon: usize,
    ) -> Result<EnsembleOutcome> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        let series = self.prepare(history, live)?;
        let (last_time, last_value) = series.last().ok_or(ForecastError::EmptyData)?;
        let reference = live.unwrap_or(LiveQuote {
            timestamp: last_time,
            price: last_value,
        });

        if series.len() < self.settings.min_observations {
            let reason = format!(
                "{} observations, need {}",
                series.len(),
                self.settings.min_observations
            );
            tracing::warn!(observations = series.len(), "series too short, using fallback");
            return Ok(self.fallback(series, reference, *orders, horizon, reason));
        }

        let level = self.settings.confidence_level;
        let members = self
            .fit_member(&orders.arima, &series, horizon, level)
            .and_then(|arima| {
                self.fit_member(&orders.sarima, &series, horizon, level)
                    .map(|sarima| (arima, sarima))
            });

        let (arima, sarima) = match members {
            Ok(fits) => fits,
            Err(e) => {
                tracing::warn!(error = %e, "ensemble member failed, using fallback");
                return Ok(self.fallback(series, reference, *orders, horizon, e.to_string()));
            }
        };

        let points = self.combine(&series, &arima.forecast, &sarima.forecast);
        let metrics = backtest(&series, orders, self.settings.train_fraction);

        Ok(self.finish(
            series,
            reference,
            points,
            ForecastMethod::Ensemble,
            *orders,
            metrics,
        ))
    }

    fn prepare(&self, history: &TimeSeries, live: Option<LiveQuote>) -> Result<TimeSeries> {
        if history.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let mut series = history.filled()?;
        if let Some(quote) = live.filter(|q| q.price.is_finite()) {
            series = series.with_observation(quote.timestamp, quote.price);
        }
        Ok(series.tail(self.settings.window))
    }

    fn fit_member(
        &self,
        order: &ModelOrder,
        series: &TimeSeries,
        horizon: usize,
        level: f64,
    ) -> Result<ModelFit> {
        let mut model = order.build();
        let fit = fit_model(model.as_mut(), series, horizon, level)?;
        tracing::debug!(
            %order,
            aic = ?fit.criteria.as_ref().map(|c| c.aic),
            ljung_box_p = ?fit.diagnostics().map(|d| d.ljung_box.p_value),
            "member fitted"
        );
        Ok(fit)
    }

    fn combine(&self, series: &TimeSeries, a: &Forecast, b: &Forecast) -> Vec<ForecastPoint> {
        let bound = |f: &Forecast, lower: bool, i: usize| {
            let band = if lower { f.lower() } else { f.upper() };
            band.map_or(f.primary()[i], |v| v[i])
        };

        (0..a.horizon().min(b.horizon()))
            .map(|i| {
                let (pa, pb) = (a.primary()[i], b.primary()[i]);
                ForecastPoint {
                    date: self.step_date(series, i),
                    value: (pa + pb) / 2.0,
                    lower: (bound(a, true, i) + bound(b, true, i)) / 2.0,
                    upper: (bound(a, false, i) + bound(b, false, i)) / 2.0,
                    std_dev: population_std_dev(&[pa, pb]),
                }
            })
            .collect()
    }

    fn fallback(
        &self,
        series: TimeSeries,
        reference: LiveQuote,
        orders: ModelOrders,
        horizon: usize,
        reason: String,
    ) -> EnsembleOutcome {
        let (forecast, spread) = fallback::project(series.values(), horizon);
        let points = self.points_from(&series, &forecast, spread);
        self.finish(
            series,
            reference,
            points,
            ForecastMethod::Fallback { reason },
            orders,
            None,
        )
    }

    fn points_from(&self, series: &TimeSeries, forecast: &Forecast, std_dev: f64) -> Vec<ForecastPoint> {
        let point = forecast.primary();
        let lower = forecast.lower().unwrap_or(point);
        let upper = forecast.upper().unwrap_or(point);
        (0..point.len())
            .map(|i| ForecastPoint {
                date: self.step_date(series, i),
                value: point[i],
                lower: lower[i],
                upper: upper[i],
                std_dev,
            })
            .collect()
    }

    fn finish(
        &self,
        series: TimeSeries,
        reference: LiveQuote,
        points: Vec<ForecastPoint>,
        method: ForecastMethod,
        orders: ModelOrders,
        metrics: Option<BacktestMetrics>,
    ) -> EnsembleOutcome {
        let volatility = annualized_volatility(series.values());
        let width = interval_width_pct(&points);
        let confidence = confidence_score(width, volatility, metrics.and_then(|m| m.mape));
        let trend = TrendSummary::from_forecast(&points, reference.price, series.values());

        EnsembleOutcome {
            points,
            method,
            orders,
            metrics,
            confidence,
            volatility,
            interval_width_pct: width,
            trend,
            history: series,
            reference,
        }
    }

    fn step_date(&self, series: &TimeSeries, step: usize) -> DateTime<Utc> {
        let last = series
            .timestamps()
            .last()
            .copied()
            .unwrap_or_default();
        last + Duration::days(i64::from(self.settings.step_days) * (step as i64 + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let timestamps = (0..values.len())
            .map(|i| base() + Duration::days(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    fn uptrend(n: usize) -> TimeSeries {
        make_series(
            (0..n)
                .map(|i| 100.0 + 0.5 * i as f64 + 0.8 * ((i as f64) * 1.3).sin())
                .collect(),
        )
    }

    #[test]
    fn ensemble_path_on_long_series() {
        let engine = EnsembleForecaster::default();
        let outcome = engine
            .forecast(&uptrend(150), None, &ModelOrders::default(), 10)
            .unwrap();

        assert_eq!(outcome.method, ForecastMethod::Ensemble);
        assert_eq!(outcome.points.len(), 10);
        assert_eq!(outcome.history.len(), 120);
        assert!(outcome.metrics.is_some());
        for (i, p) in outcome.points.iter().enumerate() {
            assert!(p.value.is_finite());
            assert!(p.lower <= p.value && p.value <= p.upper);
            assert_eq!(p.date, base() + Duration::days(150 + i as i64));
        }
        let score = outcome.confidence.value().unwrap();
        assert!((10.0..=95.0).contains(&score));
    }

    #[test]
    fn short_series_falls_back() {
        let engine = EnsembleForecaster::default();
        let series = make_series(vec![10.0, 10.5, 10.2, 10.8, 11.0]);
        let outcome = engine
            .forecast(&series, None, &ModelOrders::default(), 10)
            .unwrap();

        assert!(outcome.method.is_fallback());
        assert_eq!(outcome.points.len(), 10);
        assert!(outcome.metrics.is_none());
        let spread = crate::utils::stats::std_dev(series.values());
        assert!(outcome.points.iter().all(|p| p.std_dev == spread));
    }

    #[test]
    fn member_failure_falls_back() {
        // Enough for min_observations but too short for the seasonal member
        let engine = EnsembleForecaster::default();
        let series = make_series((0..12).map(|i| 20.0 + i as f64 * 0.3).collect());
        let outcome = engine
            .forecast(&series, None, &ModelOrders::default(), 3)
            .unwrap();

        assert!(outcome.method.is_fallback());
        assert_eq!(outcome.points.len(), 3);
        assert!(outcome.metrics.is_none());
    }

    #[test]
    fn live_quote_is_appended_and_used_as_reference() {
        let engine = EnsembleForecaster::default();
        let series = make_series(vec![5.0, 5.1, 5.2]);
        let quote = LiveQuote {
            timestamp: base() + Duration::days(3),
            price: 5.4,
        };
        let outcome = engine
            .forecast(&series, Some(quote), &ModelOrders::default(), 2)
            .unwrap();

        assert_eq!(outcome.history.len(), 4);
        assert_eq!(outcome.reference, quote);
        assert_eq!(outcome.points[0].date, base() + Duration::days(4));
    }

    #[test]
    fn stale_live_quote_replaces_last_value() {
        let engine = EnsembleForecaster::default();
        let series = make_series(vec![5.0, 5.1, 5.2]);
        let quote = LiveQuote {
            timestamp: base() + Duration::days(2),
            price: 5.3,
        };
        let outcome = engine
            .forecast(&series, Some(quote), &ModelOrders::default(), 1)
            .unwrap();

        assert_eq!(outcome.history.values(), &[5.0, 5.1, 5.3]);
    }

    #[test]
    fn input_errors_are_reported() {
        let engine = EnsembleForecaster::default();
        let empty = TimeSeries::univariate(vec![], vec![]).unwrap();
        assert!(matches!(
            engine.forecast(&empty, None, &ModelOrders::default(), 5),
            Err(ForecastError::EmptyData)
        ));
        assert!(matches!(
            engine.forecast(&uptrend(20), None, &ModelOrders::default(), 0),
            Err(ForecastError::InvalidParameter(_))
        ));

        let gaps = make_series(vec![f64::NAN; 4]);
        assert!(matches!(
            engine.forecast(&gaps, None, &ModelOrders::default(), 5),
            Err(ForecastError::MissingValues)
        ));
    }

    #[test]
    fn step_days_spaces_dates() {
        let engine = EnsembleForecaster::new(ForecastSettings {
            step_days: 7,
            ..ForecastSettings::default()
        });
        let outcome = engine
            .forecast(&make_series(vec![1.0, 2.0]), None, &ModelOrders::default(), 2)
            .unwrap();
        assert_eq!(outcome.points[1].date, base() + Duration::days(1 + 14));
    }
}
