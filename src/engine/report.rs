//! Serializable output of a forecast request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ForecastPoint;
use crate::engine::backtest::BacktestMetrics;
use crate::engine::confidence::ConfidenceScore;
use crate::engine::ensemble::EnsembleOutcome;
use crate::engine::indicators::TechnicalIndicators;
use crate::models::arima::ModelOrder;

/// How the published forecast was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Mean of the ARIMA and SARIMA members.
    Ensemble,
    /// Damped-trend naive path.
    Fallback { reason: String },
}

impl ForecastMethod {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Direction and size of the forecast move relative to the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    /// Final forecast versus the reference price, in percent.
    pub percentage_change: f64,
    /// Reference price versus the close ten observations back, in percent.
    pub recent_10d_change: f64,
}

impl TrendSummary {
    /// Summarize `points` against `reference`, with `history` for the recent move.
    pub fn from_forecast(points: &[ForecastPoint], reference: f64, history: &[f64]) -> Self {
        let last = points.last().map_or(reference, |p| p.value);
        let direction = if last > reference {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        let recent_10d_change = if history.len() > 10 {
            let base = history[history.len() - 10];
            finite_or_zero((reference - base) / base * 100.0)
        } else {
            0.0
        };

        Self {
            direction,
            percentage_change: finite_or_zero((last - reference) / reference * 100.0),
            recent_10d_change,
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub arima_order: ModelOrder,
    pub sarima_order: ModelOrder,
    pub method: ForecastMethod,
    pub ensemble_method: String,
}

/// Everything a caller needs to display one forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub symbol: String,
    pub live_price: f64,
    pub live_time: DateTime<Utc>,
    /// The prepared series the models were fitted on.
    pub historical: Vec<HistoryPoint>,
    pub forecast: Vec<ForecastPoint>,
    /// Chart indicators aligned with `historical`.
    pub indicators: TechnicalIndicators,
    pub predicted_first: Option<f64>,
    pub predicted_last: Option<f64>,
    pub trend: TrendSummary,
    pub volatility: f64,
    pub interval_width_pct: f64,
    pub confidence_score: ConfidenceScore,
    pub confidence_level: f64,
    pub accuracy_metrics: Option<BacktestMetrics>,
    pub model_info: ModelInfo,
}

impl ForecastReport {
    pub fn new(symbol: impl Into<String>, outcome: EnsembleOutcome, confidence_level: f64) -> Self {
        let historical = outcome
            .history
            .timestamps()
            .iter()
            .zip(outcome.history.values())
            .map(|(&date, &price)| HistoryPoint { date, price })
            .collect();
        let indicators = TechnicalIndicators::from_series(&outcome.history);

        Self {
            symbol: symbol.into(),
            live_price: outcome.reference.price,
            live_time: outcome.reference.timestamp,
            historical,
            indicators,
            predicted_first: outcome.points.first().map(|p| p.value),
            predicted_last: outcome.points.last().map(|p| p.value),
            forecast: outcome.points,
            trend: outcome.trend,
            volatility: outcome.volatility,
            interval_width_pct: outcome.interval_width_pct,
            confidence_score: outcome.confidence,
            confidence_level,
            accuracy_metrics: outcome.metrics,
            model_info: ModelInfo {
                arima_order: outcome.orders.arima,
                sarima_order: outcome.orders.sarima,
                method: outcome.method,
                ensemble_method: "simple_average".to_string(),
            },
        }
    }
}
