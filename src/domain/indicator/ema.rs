//! Exponential Moving Average of close.
//!
//! alpha = 2/(n+1), EMA[0] = C[0], EMA[t] = alpha*C[t] + (1-alpha)*EMA[t-1].
//! Seeded with the first close, so every index has a value (look-back 0).

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::window_arg;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::Arg;

#[derive(Debug, Clone)]
pub struct Ema {
    pub default_window: usize,
}

pub fn calculate_ema(closes: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut values = Vec::with_capacity(closes.len());
    let mut ema = 0.0;
    for (i, &close) in closes.iter().enumerate() {
        ema = if i == 0 {
            close
        } else {
            alpha * close + (1.0 - alpha) * ema
        };
        values.push(ema);
    }
    values
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "EMA"
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        window_arg("EMA", args, self.default_window, 1)?;
        Ok(0)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        let window = window_arg("EMA", args, self.default_window, 1)?;
        Ok(calculate_ema(series.close(), window))
    }
}
