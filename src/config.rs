//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::path::Path;

use crate::error::{ForecastError, Result};
use crate::models::arima::{ModelOrder, ModelOrders, OrderSearch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub forecast: ForecastSettings,
    pub orders: OrderSettings,
    pub calibration: CalibrationSettings,
    pub cache: CacheSettings,
}

/// Ensemble forecasting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Most recent observations kept for fitting.
    pub window: usize,
    /// Below this many observations the fallback forecaster is used.
    pub min_observations: usize,
    /// Two-sided level of the published bands.
    pub confidence_level: f64,
    /// Calendar days between consecutive forecast dates.
    pub step_days: u32,
    /// Leading share of the series used to train the backtest.
    pub train_fraction: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            window: 120,
            min_observations: 10,
            confidence_level: 0.95,
            step_days: 1,
            train_fraction: 0.8,
        }
    }
}

/// Which model orders the ensemble members use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSettings {
    pub arima: ModelOrder,
    pub sarima: ModelOrder,
    /// Run the order search per symbol instead of using the fixed orders.
    pub auto_select: bool,
    pub search: OrderSearch,
}

impl Default for OrderSettings {
    fn default() -> Self {
        let orders = ModelOrders::default();
        Self {
            arima: orders.arima,
            sarima: orders.sarima,
            auto_select: false,
            search: OrderSearch::default(),
        }
    }
}

impl OrderSettings {
    /// The fixed orders as a pair.
    pub fn fixed(&self) -> ModelOrders {
        ModelOrders {
            arima: self.arima,
            sarima: self.sarima,
        }
    }
}

/// Risk calibrator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Returns per rolling volatility window.
    pub rolling_window: usize,
    /// Rows with a normalized risk above this are not published.
    pub suppress_threshold: f64,
    /// Risk below this is Low.
    pub low_threshold: f64,
    /// Risk at or above this is High.
    pub high_threshold: f64,
    /// Share of exact matches that counts as leakage.
    pub leakage_ratio: f64,
    /// Absolute and relative tolerance of an exact match.
    pub leakage_tolerance: f64,
    /// Points kept between adjacent tier confidences.
    pub tier_gap: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            rolling_window: 20,
            suppress_threshold: 0.85,
            low_threshold: 0.3,
            high_threshold: 0.7,
            leakage_ratio: 0.5,
            leakage_tolerance: 1e-6,
            tier_gap: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime of a memoized historical series.
    pub price_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { price_ttl_secs: 300 }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ForecastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let f = &self.forecast;
        if f.window == 0 {
            return invalid("forecast.window must be positive");
        }
        if f.min_observations == 0 {
            return invalid("forecast.min_observations must be positive");
        }
        if !(f.confidence_level > 0.0 && f.confidence_level < 1.0) {
            return invalid("forecast.confidence_level must be in (0, 1)");
        }
        if f.step_days == 0 {
            return invalid("forecast.step_days must be positive");
        }
        if !(f.train_fraction > 0.0 && f.train_fraction < 1.0) {
            return invalid("forecast.train_fraction must be in (0, 1)");
        }

        let o = &self.orders;
        if o.arima.is_seasonal() {
            return invalid("orders.arima must not have a seasonal component");
        }
        if o.sarima.seasonal.is_none_or(|s| s.period < 2) {
            return invalid("orders.sarima needs a seasonal component with period >= 2");
        }
        if o.search.seasonal.is_some_and(|s| s.period < 2) {
            return invalid("orders.search.seasonal.period must be at least 2");
        }

        let c = &self.calibration;
        if c.rolling_window < 2 {
            return invalid("calibration.rolling_window must be at least 2");
        }
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        if !unit(c.low_threshold) || !unit(c.high_threshold) || c.low_threshold >= c.high_threshold {
            return invalid("calibration thresholds must satisfy 0 <= low < high <= 1");
        }
        if !unit(c.suppress_threshold) {
            return invalid("calibration.suppress_threshold must be in [0, 1]");
        }
        if !unit(c.leakage_ratio) {
            return invalid("calibration.leakage_ratio must be in [0, 1]");
        }
        if c.leakage_tolerance.is_nan() || c.leakage_tolerance < 0.0 {
            return invalid("calibration.leakage_tolerance must be non-negative");
        }
        if !(c.tier_gap > 0.0 && c.tier_gap < 25.0) {
            return invalid("calibration.tier_gap must be in (0, 25)");
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(ForecastError::Config(message.to_string()))
}
