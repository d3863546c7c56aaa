//! Differencing utilities for ARIMA models.

/// Apply differencing `d` times.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || series.is_empty() {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply seasonal differencing `d` times at lag `period`.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 || series.len() <= period {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            break;
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Integrate (reverse differencing) forecasts of a `d`-times differenced series.
///
/// `original` is the undifferenced history the forecasts continue.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || differenced.is_empty() {
        return differenced.to_vec();
    }

    let mut result = differenced.to_vec();

    for level in (0..d).rev() {
        // Last value of the history at this differencing level
        let init_value = difference(original, level).last().copied().unwrap_or(0.0);

        let mut cumsum = init_value;
        result = result
            .iter()
            .map(|diff| {
                cumsum += diff;
                cumsum
            })
            .collect();
    }

    result
}

/// Reverse `d` rounds of seasonal differencing at lag `period`.
///
/// Each forecast is added to the value one season back, which is either
/// history or an earlier forecast.
pub fn seasonal_integrate(differenced: &[f64], original: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 || differenced.is_empty() {
        return differenced.to_vec();
    }

    let mut result = differenced.to_vec();

    for level in (0..d).rev() {
        let mut extended = seasonal_difference(original, level, period);
        let base = extended.len();
        if base < period {
            break;
        }
        for &v in &result {
            let prev = extended[extended.len() - period];
            extended.push(v + prev);
        }
        result = extended.split_off(base);
    }

    result
}
