//! Risk-tier confidence calibration from historical prediction corpora.

pub mod corpus;
pub mod risk;

pub use corpus::{load_corpus, read_corpus};
pub use risk::{
    confidence_from_error_pct, CalibrationReport, CalibrationRow, CalibrationStats,
    PredictionRecord, RiskCalibrator, RiskConfidence, RiskTier,
};
