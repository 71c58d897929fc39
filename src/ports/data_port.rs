//! Price data supply port.

use crate::domain::error::BacktesterError;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Full daily history of `symbol`, oldest bar first.
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, BacktesterError>;

    /// Every symbol this source can supply, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, BacktesterError>;
}
