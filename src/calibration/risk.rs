//! Risk-tiered confidence calibration over past predictions.
//!
//! Each record is assigned a normalized risk from the rolling volatility of
//! actual returns. Predictions in the most volatile regime are suppressed,
//! the rest are bucketed into Low / Medium / High tiers, and each tier's
//! median percentage error is mapped to a confidence. The published map is
//! always strictly decreasing from Low to High.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationSettings;
use crate::error::{ForecastError, Result};
use crate::utils::stats::{mean, median, pct_changes, rolling_std};

/// Lowest published tier confidence.
pub const MIN_CONFIDENCE: f64 = 40.0;
/// Highest published tier confidence.
pub const MAX_CONFIDENCE: f64 = 90.0;
/// Widest tier gap that still fits three tiers inside the confidence range.
pub const MAX_TIER_GAP: f64 = (MAX_CONFIDENCE - MIN_CONFIDENCE) / 2.0;
const MIN_TIER_GAP: f64 = 0.01;

const ERROR_MIDPOINT_PCT: f64 = 15.0;
const ERROR_SCALE_PCT: f64 = 5.0;
const EXP_CLAMP: f64 = 100.0;

/// Message attached to every report for suppressed predictions.
pub const SUPPRESSION_MESSAGE: &str = "Market too volatile for reliable prediction today.";
const SUSPICIOUS_MESSAGE: &str = "Prediction accuracy flagged as suspicious";

/// One past prediction and the price that actually followed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub actual_price: f64,
    pub predicted_price: f64,
    /// Overrides the return derived from consecutive actual prices.
    #[serde(default)]
    pub actual_return: Option<f64>,
    /// Overrides the return derived from the predicted price.
    #[serde(default)]
    pub predicted_return: Option<f64>,
}

impl PredictionRecord {
    pub fn new(actual_price: f64, predicted_price: f64) -> Self {
        Self {
            date: None,
            actual_price,
            predicted_price,
            actual_return: None,
            predicted_return: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tier of a normalized risk: below `low` is Low, at or above `high` is High.
    pub fn from_risk(risk: f64, low: f64, high: f64) -> Self {
        if risk < low {
            Self::Low
        } else if risk < high {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Confidence per risk tier. Calibrated maps satisfy `low > medium > high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfidence {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl RiskConfidence {
    pub fn get(&self, tier: RiskTier) -> f64 {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    pub fn is_strictly_ordered(&self) -> bool {
        self.low > self.medium && self.medium > self.high
    }

    /// Force `low > medium > high` by `gap` points inside the confidence range.
    ///
    /// Lower tiers are raised first; when the ceiling absorbs the raise the
    /// higher-risk tiers are pushed down instead. `gap` is capped at
    /// [`MAX_TIER_GAP`] so the result never leaves `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
    pub fn enforce_ordering(mut self, gap: f64) -> Self {
        let gap = gap.max(MIN_TIER_GAP).min(MAX_TIER_GAP);

        if self.medium <= self.high {
            self.medium = self.medium.max(self.high + gap).min(MAX_CONFIDENCE);
        }
        if self.low <= self.medium {
            self.low = self.low.max(self.medium + gap).min(MAX_CONFIDENCE);
        }

        if self.low <= self.medium {
            self.medium = self.low - gap;
        }
        if self.medium <= self.high {
            self.high = (self.medium - gap).max(MIN_CONFIDENCE);
        }
        self
    }
}

/// One scored corpus row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRow {
    pub date: Option<DateTime<Utc>>,
    pub risk: f64,
    pub tier: RiskTier,
    pub actual_price: f64,
    /// `None` when the prediction was suppressed.
    pub predicted_price: Option<f64>,
    pub actual_return: f64,
    pub predicted_return: Option<f64>,
    pub prediction_suppressed: bool,
}

/// Error statistics over the published (non-suppressed) predictions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub average_predicted: f64,
    pub average_actual: f64,
    pub mean_absolute_error: f64,
    pub median_absolute_error: f64,
    pub mean_absolute_error_pct: f64,
    pub median_absolute_error_pct: f64,
    /// Logistic confidence of the overall median percentage error.
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub risk_confidence: RiskConfidence,
    /// Rows sorted by ascending risk.
    pub rows: Vec<CalibrationRow>,
    pub statistics: CalibrationStats,
    pub suspicious_accuracy: bool,
    pub warning_message: Option<String>,
    pub suppression_message: String,
}

impl CalibrationReport {
    pub fn suppressed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.prediction_suppressed).count()
    }
}

/// Map a median absolute percentage error to a confidence.
///
/// `90 / (1 + e^((err - 15) / 5))`, clamped to `[40, 90]`.
pub fn confidence_from_error_pct(error_pct: f64) -> f64 {
    let decay = ((error_pct - ERROR_MIDPOINT_PCT) / ERROR_SCALE_PCT).clamp(-EXP_CLAMP, EXP_CLAMP);
    let logistic = MAX_CONFIDENCE / (1.0 + decay.exp());
    if logistic.is_finite() {
        logistic.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    } else {
        MIN_CONFIDENCE
    }
}

/// Calibrates tier confidences from a corpus of past predictions.
#[derive(Debug, Clone, Default)]
pub struct RiskCalibrator {
    settings: CalibrationSettings,
}

impl RiskCalibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Score `records` (chronological) and calibrate the tier map.
    ///
    /// Fails with [`ForecastError::DataLeakage`] when too many published
    /// predictions equal their actuals.
    pub fn calibrate(&self, records: &[PredictionRecord]) -> Result<CalibrationReport> {
        if records.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let risk = self.normalized_risk(records);
        let mut rows = self.score_rows(records, &risk);

        let published: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| r.predicted_price.map(|p| (r.actual_price, p)))
            .collect();
        self.check_leakage(&published)?;

        let mut statistics = error_statistics(&published);
        let mut suspicious = statistics.average_actual > 0.0
            && statistics.mean_absolute_error > 0.0
            && statistics.mean_absolute_error < 0.01 * statistics.average_actual;
        if statistics.mean_absolute_error == 0.0 {
            statistics.mean_absolute_error = 0.01;
            suspicious = true;
        }

        let raw = RiskConfidence {
            low: tier_confidence(&rows, RiskTier::Low),
            medium: tier_confidence(&rows, RiskTier::Medium),
            high: tier_confidence(&rows, RiskTier::High),
        };
        let risk_confidence = raw.enforce_ordering(self.settings.tier_gap);
        if risk_confidence != raw {
            tracing::debug!(?raw, corrected = ?risk_confidence, "tier ordering corrected");
        }

        rows.sort_by(|a, b| a.risk.total_cmp(&b.risk));

        let report = CalibrationReport {
            risk_confidence,
            rows,
            statistics,
            suspicious_accuracy: suspicious,
            warning_message: suspicious.then(|| SUSPICIOUS_MESSAGE.to_string()),
            suppression_message: SUPPRESSION_MESSAGE.to_string(),
        };

        let suppressed = report.suppressed_count();
        if suppressed > 0 {
            tracing::warn!(suppressed, "predictions suppressed in high volatility");
        }
        if suspicious {
            tracing::warn!(mae = statistics.mean_absolute_error, "suspicious accuracy");
        }
        tracing::info!(
            records = records.len(),
            scored = report.rows.len(),
            low = risk_confidence.low,
            medium = risk_confidence.medium,
            high = risk_confidence.high,
            "calibration complete"
        );

        Ok(report)
    }

    /// Rolling volatility of actual returns, min-max scaled to [0, 1].
    ///
    /// Every record gets risk 0 when the volatility range is empty or flat.
    fn normalized_risk(&self, records: &[PredictionRecord]) -> Vec<f64> {
        let actual: Vec<f64> = records.iter().map(|r| r.actual_price).collect();
        let mut returns = Vec::with_capacity(actual.len());
        returns.push(f64::NAN);
        returns.extend(pct_changes(&actual));

        let volatility: Vec<f64> = rolling_std(&returns, self.settings.rolling_window)
            .into_iter()
            .map(|v| if v.is_finite() { v } else { f64::NAN })
            .collect();

        let finite = volatility.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        if !min.is_finite() || !max.is_finite() || max == min {
            return vec![0.0; records.len()];
        }
        volatility
            .into_iter()
            .map(|v| ((v - min) / (max - min)).clamp(0.0, 1.0))
            .collect()
    }

    fn score_rows(&self, records: &[PredictionRecord], risk: &[f64]) -> Vec<CalibrationRow> {
        let s = &self.settings;
        records
            .windows(2)
            .zip(&risk[1..])
            .filter_map(|(pair, &risk)| {
                let (prev, rec) = (pair[0].actual_price, &pair[1]);
                let actual_return = rec
                    .actual_return
                    .unwrap_or((rec.actual_price - prev) / prev);
                let predicted_return = rec
                    .predicted_return
                    .unwrap_or((rec.predicted_price - prev) / prev);
                let predicted_price = prev * (1.0 + predicted_return);

                let usable = [prev, rec.actual_price, predicted_price, actual_return, predicted_return, risk]
                    .iter()
                    .all(|v| v.is_finite());
                if !usable {
                    return None;
                }

                let suppressed = risk > s.suppress_threshold;
                Some(CalibrationRow {
                    date: rec.date,
                    risk,
                    tier: RiskTier::from_risk(risk, s.low_threshold, s.high_threshold),
                    actual_price: rec.actual_price,
                    predicted_price: (!suppressed).then_some(predicted_price),
                    actual_return,
                    predicted_return: (!suppressed).then_some(predicted_return),
                    prediction_suppressed: suppressed,
                })
            })
            .collect()
    }

    fn check_leakage(&self, published: &[(f64, f64)]) -> Result<()> {
        if published.is_empty() {
            return Ok(());
        }
        let tol = self.settings.leakage_tolerance;
        let matches = published
            .iter()
            .filter(|(actual, predicted)| (predicted - actual).abs() <= tol + tol * actual.abs())
            .count();
        let match_ratio = matches as f64 / published.len() as f64;
        if match_ratio > self.settings.leakage_ratio {
            tracing::error!(match_ratio, "predictions match actuals, aborting calibration");
            return Err(ForecastError::DataLeakage { match_ratio });
        }
        Ok(())
    }
}

/// Absolute percentage errors, skipping zero actuals.
fn pct_errors<'a>(pairs: impl Iterator<Item = &'a (f64, f64)>) -> Vec<f64> {
    pairs
        .filter(|(actual, _)| *actual != 0.0)
        .map(|(actual, predicted)| (predicted - actual).abs() / actual * 100.0)
        .filter(|e| e.is_finite())
        .collect()
}

fn error_statistics(published: &[(f64, f64)]) -> CalibrationStats {
    let or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
    let abs: Vec<f64> = published.iter().map(|(a, p)| (p - a).abs()).collect();
    let pct = pct_errors(published.iter());
    let actual: Vec<f64> = published.iter().map(|(a, _)| *a).collect();
    let predicted: Vec<f64> = published.iter().map(|(_, p)| *p).collect();

    let overall_error = if pct.is_empty() { 100.0 } else { median(&pct) };

    CalibrationStats {
        average_predicted: or_zero(mean(&predicted)),
        average_actual: or_zero(mean(&actual)),
        mean_absolute_error: or_zero(mean(&abs)),
        median_absolute_error: or_zero(median(&abs)),
        mean_absolute_error_pct: or_zero(mean(&pct)),
        median_absolute_error_pct: or_zero(median(&pct)),
        confidence_score: confidence_from_error_pct(overall_error),
    }
}

fn tier_confidence(rows: &[CalibrationRow], tier: RiskTier) -> f64 {
    let pairs: Vec<(f64, f64)> = rows
        .iter()
        .filter(|r| r.tier == tier)
        .filter_map(|r| r.predicted_price.map(|p| (r.actual_price, p)))
        .collect();
    let errors = pct_errors(pairs.iter());
    if errors.is_empty() {
        return MIN_CONFIDENCE;
    }
    confidence_from_error_pct(median(&errors))
}
