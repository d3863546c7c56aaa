//! Request-level entry point: prices in, reports out.

use std::sync::Arc;

use chrono::Duration;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::core::{LiveQuote, TimeSeries};
use crate::engine::cache::{Clock, OrderCache, TtlCache};
use crate::engine::ensemble::EnsembleForecaster;
use crate::engine::report::ForecastReport;
use crate::error::{Result, SourceError};
use crate::models::arima::ModelOrders;

/// Market data provider consumed by the engine.
pub trait PriceSource: Send + Sync {
    /// Daily closing prices for `symbol`, oldest first.
    fn historical(&self, symbol: &str) -> std::result::Result<TimeSeries, SourceError>;

    /// Most recent traded price for `symbol`.
    fn live_quote(&self, symbol: &str) -> std::result::Result<LiveQuote, SourceError>;
}

impl<S: PriceSource + ?Sized> PriceSource for Arc<S> {
    fn historical(&self, symbol: &str) -> std::result::Result<TimeSeries, SourceError> {
        (**self).historical(symbol)
    }

    fn live_quote(&self, symbol: &str) -> std::result::Result<LiveQuote, SourceError> {
        (**self).live_quote(symbol)
    }
}

/// Memoizes historical series of an inner source for a fixed time.
///
/// Live quotes always go to the inner source.
pub struct CachedSource<S> {
    inner: S,
    history: TtlCache<String, TimeSeries>,
}

impl<S: PriceSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            history: TtlCache::new(ttl),
        }
    }

    pub fn with_clock(inner: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            history: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Forget the memoized series of `symbol`.
    pub fn invalidate(&self, symbol: &str) {
        self.history.remove(&symbol.to_string());
    }
}

impl<S: PriceSource> PriceSource for CachedSource<S> {
    fn historical(&self, symbol: &str) -> std::result::Result<TimeSeries, SourceError> {
        let key = symbol.to_string();
        if let Some(series) = self.history.get(&key) {
            tracing::trace!(symbol, "historical cache hit");
            return Ok(series);
        }
        let series = self.inner.historical(symbol)?;
        self.history.insert(key, series.clone());
        Ok(series)
    }

    fn live_quote(&self, symbol: &str) -> std::result::Result<LiveQuote, SourceError> {
        self.inner.live_quote(symbol)
    }
}

/// Forecasts symbols from a [`PriceSource`] using one configuration.
pub struct ForecastService<S> {
    source: S,
    config: EngineConfig,
    orders: OrderCache,
    ensemble: EnsembleForecaster,
}

impl<S: PriceSource> ForecastService<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        let ensemble = EnsembleForecaster::new(config.forecast.clone());
        Self {
            source,
            config,
            orders: OrderCache::new(),
            ensemble,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn order_cache(&self) -> &OrderCache {
        &self.orders
    }

    /// Forecast `horizon` steps for `symbol`.
    ///
    /// A transient live-quote failure degrades to forecasting from history
    /// alone; any other source failure is returned.
    pub fn forecast(&self, symbol: &str, horizon: usize) -> Result<ForecastReport> {
        let history = self.source.historical(symbol)?;
        let live = match self.source.live_quote(symbol) {
            Ok(quote) => Some(quote),
            Err(e @ SourceError::Transient(_)) => {
                tracing::warn!(symbol, error = %e, "live quote unavailable, using last close");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let orders = self.orders_for(symbol, &history)?;
        let outcome = self.ensemble.forecast(&history, live, &orders, horizon)?;
        tracing::info!(
            symbol,
            horizon,
            fallback = outcome.method.is_fallback(),
            "forecast complete"
        );

        Ok(ForecastReport::new(
            symbol,
            outcome,
            self.config.forecast.confidence_level,
        ))
    }

    /// Forecast every symbol in parallel; results keep the input order.
    pub fn forecast_batch(
        &self,
        symbols: &[&str],
        horizon: usize,
    ) -> Vec<(String, Result<ForecastReport>)> {
        symbols
            .par_iter()
            .map(|&symbol| (symbol.to_string(), self.forecast(symbol, horizon)))
            .collect()
    }

    fn orders_for(&self, symbol: &str, history: &TimeSeries) -> Result<ModelOrders> {
        if !self.config.orders.auto_select {
            return Ok(self.config.orders.fixed());
        }
        if let Some(orders) = self.orders.get(symbol) {
            return Ok(*orders);
        }
        let series = history.filled()?.tail(self.config.forecast.window);
        let orders = self
            .orders
            .get_or_select(symbol, &series, &self.config.orders.search);
        Ok(*orders)
    }
}
