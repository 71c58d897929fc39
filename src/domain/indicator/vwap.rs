//! Volume-Weighted Average Price over a trailing window: sum(C*V) / sum(V).
//!
//! A window with zero total volume has no defined price and yields NaN.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Vwap {
    pub default_window: usize,
}

pub fn calculate_vwap(closes: &[f64], volumes: &[f64], window: usize) -> Vec<f64> {
    rolling(closes.len(), window, |start, end| {
        let mut weighted = 0.0;
        let mut volume = 0.0;
        for i in start..=end {
            weighted += closes[i] * volumes[i];
            volume += volumes[i];
        }
        if volume == 0.0 {
            f64::NAN
        } else {
            weighted / volume
        }
    })
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "VWAP"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("VWAP", args, self.default_window, 1)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("VWAP", args, self.default_window, 1)?;
        Ok(calculate_vwap(series.close(), series.volume(), window))
    }
}
