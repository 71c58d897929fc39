//! MFI (Money Flow Index) over a trailing window.
//!
//! Raw money flow is TP[i] * V[i] with TP the typical price. A rising TP counts
//! the flow as positive, anything else as negative.
//! MFI = 100 - 100 / (1 + positive / negative), and 100 when negative == 0.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Mfi {
    pub default_window: usize,
}

pub fn calculate_mfi(series: &PriceSeries, window: usize) -> Vec<f64> {
    let typical: Vec<f64> = (0..series.len())
        .map(|t| series.bar(t).typical_price())
        .collect();
    let volume = series.volume();
    rolling(series.len(), window, |start, end| {
        let mut positive = 0.0;
        let mut negative = 0.0;
        for i in start + 1..=end {
            let flow = typical[i] * volume[i];
            if typical[i] > typical[i - 1] {
                positive += flow;
            } else {
                negative += flow;
            }
        }
        if negative == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + positive / negative)
        }
    })
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        "MFI"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("MFI", args, self.default_window, 2)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("MFI", args, self.default_window, 2)?;
        Ok(calculate_mfi(series, window))
    }
}
