//! ROC (Rate of Change) across a trailing window.
//!
//! ROC[t] = 100 * (C[t] - C[t-n+1]) / C[t-n+1]
//! A zero starting close has no defined rate and yields NaN.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Roc {
    pub default_window: usize,
}

pub fn calculate_roc(closes: &[f64], window: usize) -> Vec<f64> {
    rolling(closes.len(), window, |start, end| {
        let first = closes[start];
        if first == 0.0 {
            f64::NAN
        } else {
            100.0 * (closes[end] - first) / first
        }
    })
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        "ROC"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("ROC", args, self.default_window, 2)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("ROC", args, self.default_window, 2)?;
        Ok(calculate_roc(series.close(), window))
    }
}
