//! Bounded confidence score from interval width, volatility and backtest error.

use crate::core::ForecastPoint;
use crate::utils::stats::{mean, pct_changes, std_dev};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lowest score the engine publishes.
pub const MIN_SCORE: f64 = 10.0;
/// Highest score the engine publishes.
pub const MAX_SCORE: f64 = 95.0;

const WIDTH_WEIGHT: f64 = 2.0;
const VOLATILITY_WEIGHT: f64 = 0.5;
const TRADING_DAYS: f64 = 252.0;

/// A score in a fixed range, or `Unknown` when an input was not finite.
///
/// Serializes as a plain number, `Unknown` as `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceScore {
    Known(f64),
    Unknown,
}

impl ConfidenceScore {
    /// Clamp `raw` into `[min, max]`; non-finite input becomes `Unknown`.
    pub fn clamped(raw: f64, min: f64, max: f64) -> Self {
        if raw.is_finite() {
            Self::Known(raw.clamp(min, max))
        } else {
            Self::Unknown
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Known(v) => Some(*v),
            Self::Unknown => None,
        }
    }
}

impl Serialize for ConfidenceScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfidenceScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<f64>::deserialize(deserializer)? {
            Some(v) => Self::clamped(v, f64::NEG_INFINITY, f64::INFINITY),
            None => Self::Unknown,
        })
    }
}

/// Average band width relative to the average point value, in percent.
///
/// Zero for an empty forecast or a zero mean value.
pub fn interval_width_pct(points: &[ForecastPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let widths: Vec<f64> = points.iter().map(ForecastPoint::width).collect();
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let avg_value = mean(&values);
    if avg_value == 0.0 {
        return 0.0;
    }
    mean(&widths) / avg_value * 100.0
}

/// Sample standard deviation of simple returns, annualized, in percent.
///
/// Zero with fewer than two returns.
pub fn annualized_volatility(values: &[f64]) -> f64 {
    let returns = pct_changes(values);
    if returns.len() < 2 {
        return 0.0;
    }
    std_dev(&returns) * TRADING_DAYS.sqrt() * 100.0
}

/// `100 - 2·width - 0.5·volatility - mape`, clamped to `[10, 95]`.
pub fn confidence_score(width_pct: f64, volatility: f64, mape: Option<f64>) -> ConfidenceScore {
    let mut score = 100.0 - width_pct * WIDTH_WEIGHT - volatility * VOLATILITY_WEIGHT;
    if let Some(mape) = mape {
        score -= mape;
    }
    ConfidenceScore::clamped(score, MIN_SCORE, MAX_SCORE)
}
