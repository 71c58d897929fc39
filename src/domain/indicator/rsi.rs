//! RSI (Relative Strength Index) over a trailing window of closes.
//!
//! The window of n closes gives n-1 changes. With avg_gain / avg_loss the
//! means of the positive and negative changes:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), and 100 when avg_loss == 0.
//!
//! Gains and losses are change magnitudes, not counts of up and down days,
//! so one large move outweighs several small ones.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{rolling, window_arg};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Rsi {
    pub default_window: usize,
}

pub fn calculate_rsi(closes: &[f64], window: usize) -> Vec<f64> {
    rolling(closes.len(), window, |start, end| {
        let mut gains = 0.0;
        let mut losses = 0.0;
        for pair in closes[start..=end].windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gains += change;
            } else {
                losses -= change;
            }
        }
        if losses == 0.0 {
            100.0
        } else {
            let changes = (end - start) as f64;
            let rs = (gains / changes) / (losses / changes);
            100.0 - 100.0 / (1.0 + rs)
        }
    })
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        Ok(window_arg("RSI", args, self.default_window, 2)? - 1)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("RSI", args, self.default_window, 2)?;
        Ok(calculate_rsi(series.close(), window))
    }
}
