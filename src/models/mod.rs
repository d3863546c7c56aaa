//! Forecasting models.

mod traits;

pub mod arima;
pub mod diagnostics;
pub mod fallback;

pub use diagnostics::{LjungBox, ResidualDiagnostics};
pub use traits::{fit_model, BoxedForecaster, Forecaster, InformationCriteria, ModelFit};
