//! # pricecast
//!
//! Multi-step price forecasting with calibrated confidence.
//!
//! The engine fits a trend-only ARIMA and a seasonal SARIMA to a closing-price
//! history, averages them into a forecast with confidence bands, backtests the
//! pair on a holdout and condenses band width, volatility and backtest error
//! into a bounded confidence score. Degenerate inputs fall back to a
//! damped-trend naive forecast instead of failing.
//!
//! Separately, [`calibration::RiskCalibrator`] turns a corpus of past
//! predictions into per-risk-tier confidences that always decrease with risk.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use pricecast::prelude::*;
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let timestamps = (0..60).map(|i| start + Duration::days(i)).collect();
//! let values = (0..60).map(|i| 100.0 + i as f64 * 0.5 + (i % 5) as f64).collect();
//! let history = TimeSeries::univariate(timestamps, values).unwrap();
//!
//! let engine = EnsembleForecaster::default();
//! let outcome = engine.forecast(&history, None, &ModelOrders::default(), 5).unwrap();
//! assert_eq!(outcome.points.len(), 5);
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod calibration;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

pub use error::{ForecastError, Result, SourceError};

pub mod prelude {
    pub use crate::calibration::{PredictionRecord, RiskCalibrator, RiskConfidence, RiskTier};
    pub use crate::config::EngineConfig;
    pub use crate::core::{Forecast, ForecastPoint, LiveQuote, TimeSeries};
    pub use crate::engine::{
        ConfidenceScore, EnsembleForecaster, ForecastReport, ForecastService, PriceSource,
    };
    pub use crate::error::{ForecastError, Result, SourceError};
    pub use crate::models::arima::{ModelOrder, ModelOrders, OrderSearch};
    pub use crate::models::Forecaster;
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
