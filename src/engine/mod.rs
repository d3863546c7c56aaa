//! Ensemble forecasting engine: members, fallback, backtest and confidence.

pub mod backtest;
pub mod cache;
pub mod confidence;
pub mod ensemble;
pub mod indicators;
pub mod report;
pub mod service;

pub use backtest::{backtest, BacktestMetrics};
pub use cache::{Clock, ManualClock, OrderCache, SystemClock, TtlCache};
pub use confidence::{annualized_volatility, confidence_score, interval_width_pct, ConfidenceScore};
pub use ensemble::{EnsembleForecaster, EnsembleOutcome};
pub use indicators::TechnicalIndicators;
pub use report::{ForecastMethod, ForecastReport, HistoryPoint, ModelInfo, TrendDirection, TrendSummary};
pub use service::{CachedSource, ForecastService, PriceSource};
