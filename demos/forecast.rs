//! Forecast a few synthetic symbols through the service.
//!
//! Run with: cargo run --example forecast [config.toml]
//! Set RUST_LOG=debug to see candidate scores and member fits.

use chrono::{Duration, TimeZone, Utc};
use pricecast::config::EngineConfig;
use pricecast::core::{LiveQuote, TimeSeries};
use pricecast::engine::{CachedSource, ForecastService, PriceSource};
use pricecast::error::SourceError;
use tracing_subscriber::EnvFilter;

/// Deterministic price paths keyed by symbol.
struct SyntheticSource;

impl SyntheticSource {
    fn closes(symbol: &str) -> Option<Vec<f64>> {
        let (n, start, drift) = match symbol {
            "TREND" => (180, 120.0, 0.6),
            "FLAT" => (150, 40.0, 0.0),
            "IPO" => (6, 18.0, 0.4),
            _ => return None,
        };
        Some(
            (0..n)
                .map(|i| {
                    start
                        + drift * i as f64
                        + 1.2 * (2.0 * std::f64::consts::PI * i as f64 / 5.0).sin()
                        + 0.4 * (i as f64 * 2.3).cos()
                })
                .collect(),
        )
    }
}

impl PriceSource for SyntheticSource {
    fn historical(&self, symbol: &str) -> Result<TimeSeries, SourceError> {
        let closes = Self::closes(symbol).ok_or_else(|| SourceError::NotFound(symbol.to_string()))?;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..closes.len()).map(|i| base + Duration::days(i as i64)).collect();
        TimeSeries::univariate(timestamps, closes).map_err(|e| SourceError::Transient(e.to_string()))
    }

    fn live_quote(&self, symbol: &str) -> Result<LiveQuote, SourceError> {
        let history = self.historical(symbol)?;
        let (timestamp, price) = history
            .last()
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))?;
        Ok(LiveQuote {
            timestamp: timestamp + Duration::days(1),
            price: price * 1.002,
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        }),
        None => EngineConfig::default(),
    };

    let ttl = Duration::seconds(config.cache.price_ttl_secs as i64);
    let source = CachedSource::new(SyntheticSource, ttl);
    let service = ForecastService::new(source, config);

    println!("=== pricecast forecast demo ===\n");
    for (symbol, result) in service.forecast_batch(&["TREND", "FLAT", "IPO", "MISSING"], 10) {
        match result {
            Ok(report) => {
                println!(
                    "{symbol}: live {:.2} -> {:.2} ({:+.2}%), confidence {:?}, method {:?}",
                    report.live_price,
                    report.predicted_last.unwrap_or(f64::NAN),
                    report.trend.percentage_change,
                    report.confidence_score.value(),
                    report.model_info.method,
                );
                if let Some(m) = report.accuracy_metrics {
                    println!("  backtest rmse {:.3} mae {:.3} mape {:?}", m.rmse, m.mae, m.mape);
                }
            }
            Err(e) => println!("{symbol}: error: {e} (retryable: {})", e.is_retryable()),
        }
    }

    if let Ok(report) = service.forecast("TREND", 3) {
        println!("\n--- TREND report ---");
        match serde_json::to_string_pretty(&report.forecast) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("{e}"),
        }
    }
}
