//! OBV (On-Balance Volume) accumulated over a trailing window.
//!
//! For each consecutive pair in the window:
//! close up: +volume, close down: -volume, unchanged: 0.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Obv {
    pub default_window: usize,
}

pub fn calculate_obv(closes: &[f64], volumes: &[f64], window: usize) -> Vec<f64> {
    rolling(closes.len(), window, |start, end| {
        let mut obv = 0.0;
        for i in start + 1..=end {
            if closes[i] > closes[i - 1] {
                obv += volumes[i];
            } else if closes[i] < closes[i - 1] {
                obv -= volumes[i];
            }
        }
        obv
    })
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "OBV"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("OBV", args, self.default_window, 2)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("OBV", args, self.default_window, 2)?;
        Ok(calculate_obv(series.close(), series.volume(), window))
    }
}
