//! TimeSeries data structure for representing closing-price histories.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest traded price of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// A univariate time series with strictly increasing timestamps.
///
/// Values may contain NaN/Inf gaps as delivered by a provider; use
/// [`TimeSeries::filled`] to obtain a gap-free copy before fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a univariate time series.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if values.len() != timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        // Validate timestamps are strictly increasing
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self { timestamps, values })
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Last observation, if any.
    pub fn last(&self) -> Option<(DateTime<Utc>, f64)> {
        Some((*self.timestamps.last()?, *self.values.last()?))
    }

    /// Extract a slice of the time series.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Copy of the most recent `n` observations (the whole series if shorter).
    pub fn tail(&self, n: usize) -> TimeSeries {
        let start = self.len().saturating_sub(n);
        TimeSeries {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Split chronologically into a leading and a trailing part at `index`.
    pub fn split_at(&self, index: usize) -> Result<(TimeSeries, TimeSeries)> {
        Ok((self.slice(0, index)?, self.slice(index, self.len())?))
    }

    /// Copy with one more observation at the tail.
    ///
    /// An observation that is not later than the current last timestamp
    /// replaces the last value instead (an intraday update of the same bar).
    pub fn with_observation(&self, timestamp: DateTime<Utc>, value: f64) -> TimeSeries {
        let mut series = self.clone();
        match series.timestamps.last() {
            Some(&last) if timestamp <= last => {
                if let Some(v) = series.values.last_mut() {
                    *v = value;
                }
            }
            _ => {
                series.timestamps.push(timestamp);
                series.values.push(value);
            }
        }
        series
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Return a copy with isolated gaps forward-filled, then leading gaps
    /// backward-filled.
    ///
    /// Fails with [`ForecastError::MissingValues`] when no value is finite.
    pub fn filled(&self) -> Result<TimeSeries> {
        if !self.has_missing_values() {
            return Ok(self.clone());
        }

        let first_valid = self
            .values
            .iter()
            .copied()
            .find(|v| v.is_finite())
            .ok_or(ForecastError::MissingValues)?;

        let mut last_valid = first_valid;
        let values = self
            .values
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    last_valid = v;
                }
                last_valid
            })
            .collect();

        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
        })
    }
}
