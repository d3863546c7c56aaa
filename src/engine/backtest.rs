//! Chronological holdout evaluation of the two-member ensemble.

use crate::core::TimeSeries;
use crate::models::arima::{ModelOrder, ModelOrders};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};

/// Accuracy of the ensemble on the held-out tail of a series.
pub type BacktestMetrics = AccuracyMetrics;

/// Refit both members on the leading `train_fraction` of `series`, forecast
/// the remainder and score the averaged forecast.
///
/// Accuracy is best effort: an empty holdout or any fitting failure yields
/// `None`, never an error.
pub fn backtest(
    series: &TimeSeries,
    orders: &ModelOrders,
    train_fraction: f64,
) -> Option<BacktestMetrics> {
    let n = series.len();
    let train_size = (n as f64 * train_fraction).floor() as usize;
    let test_size = n.saturating_sub(train_size);
    if test_size == 0 || train_size == 0 {
        tracing::debug!(observations = n, train_size, "holdout is empty, skipping backtest");
        return None;
    }

    let (train, test) = match series.split_at(train_size) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(error = %e, "backtest split failed");
            return None;
        }
    };

    let arima = member_forecast(&orders.arima, &train, test_size)?;
    let sarima = member_forecast(&orders.sarima, &train, test_size)?;

    let ensemble: Vec<f64> = arima
        .iter()
        .zip(&sarima)
        .map(|(a, s)| (a + s) / 2.0)
        .collect();

    match calculate_metrics(test.values(), &ensemble) {
        Ok(metrics) if metrics.rmse.is_finite() && metrics.mae.is_finite() => Some(metrics),
        Ok(_) => {
            tracing::warn!("backtest produced non-finite metrics");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "backtest metrics failed");
            None
        }
    }
}

fn member_forecast(order: &ModelOrder, train: &TimeSeries, steps: usize) -> Option<Vec<f64>> {
    let mut model = order.build();
    let forecast = model.fit(train).and_then(|()| model.predict(steps));
    match forecast {
        Ok(f) if f.is_finite() => Some(f.primary().to_vec()),
        Ok(_) => {
            tracing::warn!(%order, "backtest forecast is not finite");
            None
        }
        Err(e) => {
            tracing::warn!(%order, error = %e, "backtest refit failed");
            None
        }
    }
}
