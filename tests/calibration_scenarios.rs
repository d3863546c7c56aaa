//! Calibration runs over synthetic and file-backed corpora.

use std::io::Write;

use pricecast::calibration::{load_corpus, PredictionRecord, RiskCalibrator, RiskTier};
use pricecast::config::CalibrationSettings;
use pricecast::error::ForecastError;

/// Prices whose volatility ramps up over time. `error_at` gives the relative
/// prediction error for a row given its position in the corpus.
fn ramping_corpus(n: usize, error_at: impl Fn(usize) -> f64) -> Vec<PredictionRecord> {
    let mut price = 200.0;
    (0..n)
        .map(|i| {
            let swing = 0.001 + 0.04 * i as f64 / n as f64;
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            price *= 1.0 + sign * swing * (1.0 + (i % 4) as f64 * 0.25);
            PredictionRecord::new(price, price * (1.0 + error_at(i)))
        })
        .collect()
}

#[test]
fn ninety_percent_exact_matches_is_leakage() {
    let records = ramping_corpus(100, |i| if i % 10 == 0 { 0.03 } else { 0.0 });
    let err = RiskCalibrator::default().calibrate(&records).unwrap_err();

    match err {
        ForecastError::DataLeakage { match_ratio } => assert!(match_ratio > 0.8),
        other => panic!("expected leakage, got {other:?}"),
    }
}

#[test]
fn inverted_corpus_is_corrected() {
    // Calm early rows are badly predicted, turbulent late rows are nearly right
    let records = ramping_corpus(120, |i| if i < 60 { 0.40 } else { 0.004 });
    let settings = CalibrationSettings {
        suppress_threshold: 1.0,
        ..CalibrationSettings::default()
    };
    let report = RiskCalibrator::new(settings).calibrate(&records).unwrap();

    let tiers: Vec<RiskTier> = report.rows.iter().map(|r| r.tier).collect();
    assert!(tiers.contains(&RiskTier::Low));
    assert!(tiers.contains(&RiskTier::High));

    let map = report.risk_confidence;
    assert!(map.is_strictly_ordered(), "{map:?}");
    assert!(map.low <= 90.0 && map.high >= 40.0);
    assert_eq!(report.suppressed_count(), 0);
}

#[test]
fn flat_prices_put_everything_in_low_tier() {
    let records: Vec<PredictionRecord> = (0..40)
        .map(|i| PredictionRecord::new(50.0, 50.0 + if i % 2 == 0 { 1.0 } else { -1.0 }))
        .collect();
    let report = RiskCalibrator::default().calibrate(&records).unwrap();

    assert_eq!(report.rows.len(), 39);
    assert!(report.rows.iter().all(|r| r.risk == 0.0 && r.tier == RiskTier::Low));
    assert!(report.risk_confidence.is_strictly_ordered());
    assert!((report.statistics.median_absolute_error_pct - 2.0).abs() < 1e-9);
}

#[test]
fn csv_corpus_round_trip() {
    let records = ramping_corpus(60, |i| 0.01 + 0.001 * (i % 7) as f64);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Date,Actual Price,Predicted Price").unwrap();
    for (i, r) in records.iter().enumerate().rev() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
        writeln!(file, "{day},{},{}", r.actual_price, r.predicted_price).unwrap();
    }
    file.flush().unwrap();

    let loaded = load_corpus(file.path()).unwrap();
    assert_eq!(loaded.len(), 60);
    assert!(loaded.windows(2).all(|w| w[0].date < w[1].date));
    assert!((loaded[0].actual_price - records[0].actual_price).abs() < 1e-9);

    let report = RiskCalibrator::default().calibrate(&loaded).unwrap();
    assert!(report.risk_confidence.is_strictly_ordered());
    assert_eq!(report.rows.len(), 40);
    assert!(report.rows.iter().all(|r| r.date.is_some()));
}
