//! Rolling quantile of an indicator column (`IndQuantile`).
//!
//! Linear interpolation between order statistics: for n sorted values and
//! quantile q, h = (n-1)q and the result is x[floor(h)] + (h - floor(h)) * (x[floor(h)+1] - x[floor(h)]).

use crate::domain::error::IndicatorError;
use crate::domain::indicator_helpers::rolling;

/// Reject quantiles outside [0, 1] (NaN included).
pub fn check_quantile(q: f64) -> Result<f64, IndicatorError> {
    if (0.0..=1.0).contains(&q) {
        Ok(q)
    } else {
        Err(IndicatorError::InvalidQuantile { value: q })
    }
}

/// Quantile of `values`. Sorts in place. Empty input or any NaN gives NaN.
pub fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let h = (values.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(values.len() - 1);
    values[lo] + (h - lo as f64) * (values[hi] - values[lo])
}

/// Quantile of `column` over each trailing window `[t-window+1, t]`.
pub fn rolling_quantile(column: &[f64], window: usize, q: f64) -> Vec<f64> {
    let mut scratch = Vec::with_capacity(window.min(column.len()));
    rolling(column.len(), window, |start, end| {
        scratch.clear();
        scratch.extend_from_slice(&column[start..=end]);
        quantile(&mut scratch, q)
    })
}
