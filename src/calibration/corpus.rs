//! Loading prediction-versus-actual corpora from CSV.
//!
//! Column names are matched loosely: headers are trimmed and lowercased, the
//! date column is the first one mentioning `date` or `time`, actual prices
//! come from the first `actual`/`real` column and predictions from the first
//! `pred` column. `actual_return` and `predicted_return` are picked up when
//! present.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::calibration::risk::PredictionRecord;
use crate::error::{ForecastError, Result};

struct Columns {
    date: Option<usize>,
    actual: usize,
    predicted: usize,
    actual_return: Option<usize>,
    predicted_return: Option<usize>,
}

impl Columns {
    fn detect(headers: &[String]) -> Result<Self> {
        let exact = |name: &str| headers.iter().position(|h| h == name);

        let actual_return = exact("actual_return");
        let predicted_return = exact("predicted_return");
        let is_return = |i: usize| Some(i) == actual_return || Some(i) == predicted_return;

        let date = headers
            .iter()
            .position(|h| h.contains("date") || h.contains("time"));
        let actual = headers
            .iter()
            .enumerate()
            .position(|(i, h)| !is_return(i) && (h.contains("actual") || h.contains("real")));
        let predicted = headers
            .iter()
            .enumerate()
            .position(|(i, h)| !is_return(i) && h.contains("pred"));

        match (actual, predicted) {
            (Some(actual), Some(predicted)) => Ok(Self {
                date,
                actual,
                predicted,
                actual_return,
                predicted_return,
            }),
            _ => Err(ForecastError::Corpus(format!(
                "no actual/predicted columns among {headers:?}"
            ))),
        }
    }
}

/// Read a corpus file. See [`read_corpus`].
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<PredictionRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ForecastError::Corpus(format!("{}: {e}", path.display())))?;
    read_corpus(BufReader::new(file))
}

/// Parse CSV corpus rows.
///
/// Rows without a numeric actual and predicted price are dropped. When a
/// date column exists rows are sorted by it, undated rows last.
pub fn read_corpus<R: Read>(reader: R) -> Result<Vec<PredictionRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ForecastError::Corpus(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let columns = Columns::detect(&headers)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let row = row.map_err(|e| ForecastError::Corpus(e.to_string()))?;
        let number = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| !v.is_nan())
        };

        match (number(Some(columns.actual)), number(Some(columns.predicted))) {
            (Some(actual_price), Some(predicted_price)) => records.push(PredictionRecord {
                date: columns.date.and_then(|i| row.get(i)).and_then(parse_date),
                actual_price,
                predicted_price,
                actual_return: number(columns.actual_return),
                predicted_return: number(columns.predicted_return),
            }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "corpus rows without prices dropped");
    }
    if columns.date.is_some() {
        // Stable: undated rows keep their relative order at the end
        records.sort_by_key(|r| (r.date.is_none(), r.date));
    }
    Ok(records)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn detects_loose_column_names() {
        let csv = "\
 Date ,Actual Close,Predicted Close
2024-01-03,101.0,100.5
2024-01-01,99.0,98.0
2024-01-02,100.0,
";
        let records = read_corpus(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].actual_price, 99.0);
        assert_eq!(
            records[0].date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(records[1].predicted_price, 100.5);
        assert!(records[1].actual_return.is_none());
    }

    #[test]
    fn return_columns_are_not_mistaken_for_prices() {
        let csv = "actual_return,predicted_return,real_price,prediction\n0.01,0.02,10.0,10.2\n";
        let records = read_corpus(csv.as_bytes()).unwrap();

        assert_eq!(records[0].actual_price, 10.0);
        assert_eq!(records[0].predicted_price, 10.2);
        assert_eq!(records[0].actual_return, Some(0.01));
        assert_eq!(records[0].predicted_return, Some(0.02));
        assert!(records[0].date.is_none());
    }

    #[test]
    fn undated_rows_sort_last() {
        let csv = "timestamp,actual,pred\nbad,1.0,1.1\n2024-02-01T10:00:00Z,2.0,2.1\n";
        let records = read_corpus(csv.as_bytes()).unwrap();
        assert_eq!(records[0].actual_price, 2.0);
        assert!(records[1].date.is_none());
    }

    #[test]
    fn missing_columns_is_a_corpus_error() {
        let err = read_corpus("date,close\n2024-01-01,1.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ForecastError::Corpus(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,actual_price,predicted_price").unwrap();
        writeln!(file, "2024-01-01 16:00:00,50.0,51.0").unwrap();
        file.flush().unwrap();

        let records = load_corpus(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap())
        );

        assert!(matches!(
            load_corpus("/nonexistent/corpus.csv"),
            Err(ForecastError::Corpus(_))
        ));
    }
}
