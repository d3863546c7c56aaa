//! Core data structures for time series forecasting.

mod forecast;
mod time_series;

pub use forecast::{Forecast, ForecastPoint};
pub use time_series::{LiveQuote, TimeSeries};
