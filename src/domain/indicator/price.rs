//! Per-bar price field indicators. No look-back; value at t reads bar t only.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::no_args;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::domain::rule::Arg;

/// Spelling used by older strategy files for `PricePercentageChangeOpenToClose`.
pub const MISSPELLED_PERCENT_CHANGE: &str = "PricePercentangeChangeOpenToClose";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    Close,
    High,
    Low,
    Volume,
    WeightedClose,
    TypicalPrice,
    MedianPrice,
    /// 100 * (C / O - 1)
    PercentChangeOpenToClose,
    /// 100 * (C - L) / (H - L)
    ClosingBias,
    /// 100 * (C - O) / (H - L)
    ExtensionRatio,
}

impl PriceField {
    pub const ALL: [PriceField; 11] = [
        PriceField::Open,
        PriceField::Close,
        PriceField::High,
        PriceField::Low,
        PriceField::Volume,
        PriceField::WeightedClose,
        PriceField::TypicalPrice,
        PriceField::MedianPrice,
        PriceField::PercentChangeOpenToClose,
        PriceField::ClosingBias,
        PriceField::ExtensionRatio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PriceField::Open => "OpenPrice",
            PriceField::Close => "ClosePrice",
            PriceField::High => "HighPrice",
            PriceField::Low => "LowPrice",
            PriceField::Volume => "TradingVolume",
            PriceField::WeightedClose => "WeightedClose",
            PriceField::TypicalPrice => "TypicalPrice",
            PriceField::MedianPrice => "MedianPrice",
            PriceField::PercentChangeOpenToClose => "PricePercentageChangeOpenToClose",
            PriceField::ClosingBias => "ClosingBias",
            PriceField::ExtensionRatio => "ExtensionRatio",
        }
    }

    /// Value of this field for one bar. Zero-range bars give NaN for the range ratios.
    pub fn of(self, bar: &OhlcvBar) -> f64 {
        let range = bar.high - bar.low;
        match self {
            PriceField::Open => bar.open,
            PriceField::Close => bar.close,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Volume => bar.volume,
            PriceField::WeightedClose => bar.weighted_close(),
            PriceField::TypicalPrice => bar.typical_price(),
            PriceField::MedianPrice => bar.median_price(),
            PriceField::PercentChangeOpenToClose => 100.0 * (bar.close / bar.open - 1.0),
            PriceField::ClosingBias if range == 0.0 => f64::NAN,
            PriceField::ClosingBias => 100.0 * (bar.close - bar.low) / range,
            PriceField::ExtensionRatio if range == 0.0 => f64::NAN,
            PriceField::ExtensionRatio => 100.0 * (bar.close - bar.open) / range,
        }
    }
}

impl Indicator for PriceField {
    fn name(&self) -> &str {
        self.label()
    }

    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError> {
        no_args(self.label(), args)?;
        Ok(0)
    }

    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError> {
        no_args(self.label(), args)?;
        let values = match self {
            PriceField::Open => series.open().to_vec(),
            PriceField::Close => series.close().to_vec(),
            PriceField::High => series.high().to_vec(),
            PriceField::Low => series.low().to_vec(),
            PriceField::Volume => series.volume().to_vec(),
            _ => (0..series.len()).map(|t| self.of(&series.bar(t))).collect(),
        };
        Ok(values)
    }
}
