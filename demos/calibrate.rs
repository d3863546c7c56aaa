//! Calibrate risk-tier confidences from a prediction corpus.
//!
//! Run with: cargo run --example calibrate [corpus.csv]
//! Without an argument a synthetic corpus is used.

use pricecast::calibration::{load_corpus, PredictionRecord, RiskCalibrator};
use pricecast::config::CalibrationSettings;
use tracing_subscriber::EnvFilter;

fn synthetic_corpus(n: usize) -> Vec<PredictionRecord> {
    let mut price = 250.0;
    (0..n)
        .map(|i| {
            let regime = if (i / 40) % 2 == 0 { 0.004 } else { 0.025 };
            let sign = if (i * 7) % 3 == 0 { -1.0 } else { 1.0 };
            price *= 1.0 + sign * regime * (0.5 + (i % 5) as f64 * 0.25);
            let miss = 0.01 + regime * (0.5 + (i % 3) as f64 * 0.5);
            PredictionRecord::new(price, price * (1.0 + miss))
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let records = match std::env::args().nth(1) {
        Some(path) => match load_corpus(&path) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => synthetic_corpus(240),
    };

    println!("=== pricecast risk calibration ===\n");
    println!("Corpus: {} records", records.len());

    let calibrator = RiskCalibrator::new(CalibrationSettings::default());
    let report = match calibrator.calibrate(&records) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("calibration failed: {e}");
            std::process::exit(1);
        }
    };

    let map = report.risk_confidence;
    println!("Low risk:    {:.1}", map.low);
    println!("Medium risk: {:.1}", map.medium);
    println!("High risk:   {:.1}", map.high);

    let stats = report.statistics;
    println!("\nMAE {:.3} (median {:.3})", stats.mean_absolute_error, stats.median_absolute_error);
    println!(
        "MAPE {:.2}% (median {:.2}%)",
        stats.mean_absolute_error_pct, stats.median_absolute_error_pct
    );
    println!("Overall confidence {:.1}", stats.confidence_score);
    println!("Suppressed rows: {}", report.suppressed_count());
    if let Some(warning) = &report.warning_message {
        println!("Warning: {warning}");
    }
}
