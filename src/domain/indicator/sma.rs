//! Simple Moving Average of close over a trailing window.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Sma {
    pub default_window: usize,
}

pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<f64> {
    rolling(closes.len(), window, |start, end| {
        closes[start..=end].iter().sum::<f64>() / window as f64
    })
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "SMA"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("SMA", args, self.default_window, 1)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("SMA", args, self.default_window, 1)?;
        Ok(calculate_sma(series.close(), window))
    }
}
