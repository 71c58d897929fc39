//! OHLCV bars and the column-oriented price series the engine evaluates against.

use crate::domain::error::BacktesterError;
use chrono::NaiveDate;

/// One trading day for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// (2 * close + high + low) / 4
    pub fn weighted_close(&self) -> f64 {
        (2.0 * self.close + self.high + self.low) / 4.0
    }

    /// (high + low) / 2
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Parallel columns of dates and OHLCV fields for a single symbol.
///
/// All columns share the time index `0..len()`, dates strictly increasing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceSeries {
    symbol: String,
    dates: Vec<NaiveDate>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        dates: Vec<NaiveDate>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self, BacktesterError> {
        let symbol = symbol.into();
        let n = dates.len();
        for (field, len) in [
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
            ("close", close.len()),
            ("volume", volume.len()),
        ] {
            if len != n {
                return Err(BacktesterError::InvalidSeries {
                    symbol,
                    reason: format!("{} has {} values, expected {}", field, len, n),
                });
            }
        }
        if let Some(i) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(BacktesterError::InvalidSeries {
                symbol,
                reason: format!("dates not strictly increasing at index {}", i + 1),
            });
        }
        Ok(Self {
            symbol,
            dates,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Build a series from row bars. Bars must already be in date order.
    pub fn from_bars(symbol: impl Into<String>, bars: &[OhlcvBar]) -> Result<Self, BacktesterError> {
        Self::new(
            symbol,
            bars.iter().map(|b| b.date).collect(),
            bars.iter().map(|b| b.open).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.close).collect(),
            bars.iter().map(|b| b.volume).collect(),
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Row view of index `t`. Panics if `t` is out of range.
    pub fn bar(&self, t: usize) -> OhlcvBar {
        OhlcvBar {
            date: self.dates[t],
            open: self.open[t],
            high: self.high[t],
            low: self.low[t],
            close: self.close[t],
            volume: self.volume[t],
        }
    }

    /// Copy of the first `len` rows. Used to replay a series as of an earlier day.
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.len());
        Self {
            symbol: self.symbol.clone(),
            dates: self.dates[..len].to_vec(),
            open: self.open[..len].to_vec(),
            high: self.high[..len].to_vec(),
            low: self.low[..len].to_vec(),
            close: self.close[..len].to_vec(),
            volume: self.volume[..len].to_vec(),
        }
    }
}
