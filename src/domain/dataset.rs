//! Per-symbol data bundles and the symbol-keyed dataset the evaluator reads.

use crate::domain::error::BacktesterError;
use crate::domain::indicator_table::IndicatorTable;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// A symbol's price series together with its lazily-filled indicator table.
#[derive(Debug, Clone)]
pub struct StockData {
    series: PriceSeries,
    indicators: IndicatorTable,
    date_index: HashMap<NaiveDate, usize>,
}

impl StockData {
    pub fn new(series: PriceSeries) -> Self {
        let date_index = series
            .dates()
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();
        Self {
            series,
            indicators: IndicatorTable::new(),
            date_index,
        }
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn indicators(&self) -> &IndicatorTable {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }
}

impl PartialEq for StockData {
    fn eq(&self, other: &Self) -> bool {
        self.series == other.series && self.indicators == other.indicators
    }
}

/// Every symbol under evaluation, ordered by symbol name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    stocks: BTreeMap<String, StockData>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series, replacing any previous data for the same symbol.
    pub fn insert(&mut self, series: PriceSeries) -> Option<StockData> {
        self.stocks
            .insert(series.symbol().to_string(), StockData::new(series))
    }

    pub fn get(&self, symbol: &str) -> Result<&StockData, BacktesterError> {
        self.stocks
            .get(symbol)
            .ok_or_else(|| BacktesterError::InvalidSymbol {
                symbol: symbol.to_string(),
            })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.contains_key(symbol)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.stocks.keys().map(String::as_str).collect()
    }

    pub fn stocks(&self) -> &BTreeMap<String, StockData> {
        &self.stocks
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

impl FromIterator<PriceSeries> for Dataset {
    fn from_iter<I: IntoIterator<Item = PriceSeries>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for series in iter {
            dataset.insert(series);
        }
        dataset
    }
}
