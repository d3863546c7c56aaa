//! End-to-end forecasting scenarios through the public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pricecast::config::EngineConfig;
use pricecast::core::{LiveQuote, TimeSeries};
use pricecast::engine::{
    ConfidenceScore, EnsembleForecaster, ForecastMethod, ForecastReport, ForecastService,
    PriceSource, TrendDirection,
};
use pricecast::error::SourceError;
use pricecast::models::arima::ModelOrders;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
}

fn make_series(values: Vec<f64>) -> TimeSeries {
    let timestamps = (0..values.len())
        .map(|i| start() + Duration::days(i as i64))
        .collect();
    TimeSeries::univariate(timestamps, values).unwrap()
}

/// Ascending closes with a mild weekly wiggle.
fn uptrend(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 150.0 + 0.8 * i as f64 + 1.5 * (2.0 * std::f64::consts::PI * i as f64 / 5.0).sin())
        .collect()
}

struct MemorySource {
    closes: Vec<f64>,
}

impl PriceSource for MemorySource {
    fn historical(&self, symbol: &str) -> Result<TimeSeries, SourceError> {
        if symbol != "ACME" {
            return Err(SourceError::NotFound(symbol.to_string()));
        }
        Ok(make_series(self.closes.clone()))
    }

    fn live_quote(&self, _symbol: &str) -> Result<LiveQuote, SourceError> {
        let last = *self.closes.last().ok_or(SourceError::Transient("empty".into()))?;
        Ok(LiveQuote {
            timestamp: start() + Duration::days(self.closes.len() as i64),
            price: last + 0.5,
        })
    }
}

#[test]
fn uptrend_forecasts_up_with_widening_bounds() {
    let outcome = EnsembleForecaster::default()
        .forecast(&make_series(uptrend(120)), None, &ModelOrders::default(), 10)
        .unwrap();

    assert_eq!(outcome.method, ForecastMethod::Ensemble);
    assert_eq!(outcome.points.len(), 10);
    assert_eq!(outcome.trend.direction, TrendDirection::Up);
    assert!(outcome.points[9].value > outcome.points[0].value);

    let widths: Vec<f64> = outcome.points.iter().map(|p| p.upper - p.lower).collect();
    for (step, pair) in widths.windows(2).enumerate() {
        assert!(pair[1] >= pair[0], "band narrowed at step {}: {widths:?}", step + 1);
    }
    assert!(widths[9] > widths[0], "band should widen: {widths:?}");

    let metrics = outcome.metrics.expect("backtest on 120 points");
    assert_eq!(metrics.test_size, 24);
    assert!(metrics.mape.is_some());
}

#[test]
fn five_points_fall_back_without_metrics() {
    let series = make_series(vec![20.0, 20.4, 20.1, 20.9, 21.2]);
    let outcome = EnsembleForecaster::default()
        .forecast(&series, None, &ModelOrders::default(), 10)
        .unwrap();

    assert!(outcome.method.is_fallback());
    assert_eq!(outcome.points.len(), 10);
    assert!(outcome.metrics.is_none());
    match outcome.confidence {
        ConfidenceScore::Known(score) => assert!((10.0..=95.0).contains(&score)),
        ConfidenceScore::Unknown => panic!("finite series gave unknown confidence"),
    }
}

#[test]
fn service_report_serializes_to_contract() {
    let service = ForecastService::new(
        MemorySource { closes: uptrend(90) },
        EngineConfig::default(),
    );
    let report = service.forecast("ACME", 7).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["symbol"], "ACME");
    assert_eq!(json["forecast"].as_array().unwrap().len(), 7);
    for key in ["date", "value", "lower", "upper", "std_dev"] {
        assert!(json["forecast"][0].get(key).is_some(), "missing {key}");
    }
    assert!(json["confidence_score"].is_number());
    assert_eq!(json["confidence_level"], 0.95);
    assert_eq!(json["model_info"]["arima_order"]["p"], 5);
    assert_eq!(json["model_info"]["sarima_order"]["seasonal"]["period"], 5);
    assert_eq!(json["model_info"]["ensemble_method"], "simple_average");
    assert!(json["model_info"]["arima_order"].get("seasonal").is_none());
    assert!(json.get("accuracy_metrics").is_some());

    let indicators = &json["indicators"];
    let history_len = json["historical"].as_array().unwrap().len();
    for key in [
        "dates",
        "sma_20",
        "ema_20",
        "rsi",
        "macd",
        "macd_signal",
        "macd_hist",
        "bb_upper",
        "bb_lower",
    ] {
        assert_eq!(indicators[key].as_array().unwrap().len(), history_len, "{key}");
    }
    assert_eq!(indicators["sma_20"][0], 0.0);
    assert!(indicators["rsi"][history_len - 1].as_f64().unwrap() > 50.0);

    let back: ForecastReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.symbol, report.symbol);
    assert_eq!(back.forecast.len(), 7);
    assert_eq!(back.forecast[6].date, report.forecast[6].date);
    assert_eq!(back.indicators.len(), report.historical.len());
}

#[test]
fn fallback_report_has_null_metrics() {
    let service = ForecastService::new(
        MemorySource {
            closes: vec![10.0, 10.2, 10.1],
        },
        EngineConfig::default(),
    );
    let report = service.forecast("ACME", 4).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["accuracy_metrics"].is_null());
    assert_eq!(json["model_info"]["method"]["kind"], "fallback");
    assert_eq!(report.historical.len(), 4);
    assert!((report.live_price - 10.6).abs() < 1e-12);
}

#[test]
fn service_errors_distinguish_missing_symbols() {
    let service = ForecastService::new(MemorySource { closes: uptrend(30) }, EngineConfig::default());
    let err = service.forecast("OTHER", 5).unwrap_err();
    assert!(!err.is_retryable());
}
