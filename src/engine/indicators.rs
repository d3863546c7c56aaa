//! Chart indicators over the prepared price history.
//!
//! Every series is aligned with the history. Positions where an indicator is
//! not defined yet (warm-up windows, RSI without any movement) are reported
//! as 0 so the block always serializes to plain numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::TimeSeries;
use crate::utils::stats::{ewm_mean, rolling_mean, rolling_std};

pub const SMA_WINDOW: usize = 20;
pub const EMA_SPAN: usize = 20;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
pub const RSI_WINDOW: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub dates: Vec<DateTime<Utc>>,
    pub sma_20: Vec<f64>,
    pub ema_20: Vec<f64>,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_lower: Vec<f64>,
}

impl TechnicalIndicators {
    pub fn from_series(series: &TimeSeries) -> Self {
        let prices = series.values();

        let sma = rolling_mean(prices, SMA_WINDOW);
        let (bb_upper, bb_lower) = bollinger_bands(prices, BOLLINGER_WINDOW, BOLLINGER_WIDTH);
        let (line, signal, hist) = macd(prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        Self {
            dates: series.timestamps().to_vec(),
            sma_20: zero_undefined(sma),
            ema_20: zero_undefined(ewm_mean(prices, span_alpha(EMA_SPAN))),
            rsi: zero_undefined(relative_strength_index(prices, RSI_WINDOW)),
            macd: zero_undefined(line),
            macd_signal: zero_undefined(signal),
            macd_hist: zero_undefined(hist),
            bb_upper: zero_undefined(bb_upper),
            bb_lower: zero_undefined(bb_lower),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Smoothing factor of an exponential mean over `span` periods.
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Relative strength index from simple rolling means of gains and losses.
///
/// NaN during the warm-up window and where prices did not move at all; 100
/// when the window holds gains only.
pub fn relative_strength_index(prices: &[f64], window: usize) -> Vec<f64> {
    let mut gains = Vec::with_capacity(prices.len());
    let mut losses = Vec::with_capacity(prices.len());
    if !prices.is_empty() {
        gains.push(0.0);
        losses.push(0.0);
    }
    for pair in prices.windows(2) {
        let delta = pair[1] - pair[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    rolling_mean(&gains, window)
        .into_iter()
        .zip(rolling_mean(&losses, window))
        .map(|(gain, loss)| {
            if loss == 0.0 && gain > 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

/// MACD line, its signal line and the histogram between them.
pub fn macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast = ewm_mean(prices, span_alpha(fast));
    let slow = ewm_mean(prices, span_alpha(slow));
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ewm_mean(&line, span_alpha(signal));
    let hist = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    (line, signal, hist)
}

/// Upper and lower bands `width` sample deviations around the rolling mean.
pub fn bollinger_bands(prices: &[f64], window: usize, width: f64) -> (Vec<f64>, Vec<f64>) {
    rolling_mean(prices, window)
        .into_iter()
        .zip(rolling_std(prices, window))
        .map(|(mid, sd)| (mid + width * sd, mid - width * sd))
        .unzip()
}

fn zero_undefined(values: Vec<f64>) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { v } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| base + Duration::days(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn rsi_known_values() {
        let rsi = relative_strength_index(&[10.0, 12.0, 11.0, 13.0], 2);
        assert!(rsi[0].is_nan());
        assert_eq!(rsi[1], 100.0);
        // Mean gain 1, mean loss 0.5
        assert_relative_eq!(rsi[2], 200.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(rsi[3], 200.0 / 3.0, epsilon = 1e-12);

        assert!(relative_strength_index(&[5.0; 4], 2)[3].is_nan());
        assert_eq!(relative_strength_index(&[5.0, 4.0, 3.0], 2)[2], 0.0);
        assert!(relative_strength_index(&[], 2).is_empty());
    }

    #[test]
    fn macd_known_values() {
        let (line, signal, hist) = macd(&[10.0, 13.0], 1, 3, 3);
        // Fast span 1 tracks the price, slow span 3 moves halfway
        assert_eq!(line, vec![0.0, 1.5]);
        assert_eq!(signal, vec![0.0, 0.75]);
        assert_eq!(hist, vec![0.0, 0.75]);
    }

    #[test]
    fn bollinger_known_values() {
        let (upper, lower) = bollinger_bands(&[1.0, 3.0, 5.0], 3, 2.0);
        assert!(upper[1].is_nan());
        // Mean 3, sample std 2
        assert_relative_eq!(upper[2], 7.0, epsilon = 1e-12);
        assert_relative_eq!(lower[2], -1.0, epsilon = 1e-12);
        assert_relative_eq!(span_alpha(20), 2.0 / 21.0, epsilon = 1e-15);
    }

    #[test]
    fn block_is_aligned_and_zero_filled() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let indicators = TechnicalIndicators::from_series(&make_series(values));

        assert_eq!(indicators.len(), 40);
        for column in [
            &indicators.sma_20,
            &indicators.ema_20,
            &indicators.rsi,
            &indicators.macd,
            &indicators.macd_signal,
            &indicators.macd_hist,
            &indicators.bb_upper,
            &indicators.bb_lower,
        ] {
            assert_eq!(column.len(), 40);
            assert!(column.iter().all(|v| v.is_finite()));
        }

        assert_eq!(indicators.sma_20[18], 0.0);
        // Mean of 100..=119
        assert_relative_eq!(indicators.sma_20[19], 109.5, epsilon = 1e-12);
        assert_eq!(indicators.rsi[12], 0.0);
        assert_eq!(indicators.rsi[13], 100.0);
        assert_eq!(indicators.ema_20[0], 100.0);
        // Steady rise keeps the fast mean above the slow one
        assert!(indicators.macd[39] > 0.0);
        assert!(indicators.bb_upper[39] > indicators.sma_20[39]);
        assert!(indicators.bb_lower[39] < indicators.sma_20[39]);
    }

    #[test]
    fn flat_prices_have_no_rsi() {
        let indicators = TechnicalIndicators::from_series(&make_series(vec![7.0; 25]));
        assert!(indicators.rsi.iter().all(|&v| v == 0.0));
        assert!(indicators.macd.iter().all(|&v| v == 0.0));
        assert_relative_eq!(indicators.bb_upper[24], 7.0, epsilon = 1e-12);
    }
}
