#![allow(dead_code)]

use chrono::NaiveDate;
use stratbench::domain::dataset::Dataset;
use stratbench::domain::error::BacktesterError;
pub use stratbench::domain::ohlcv::{OhlcvBar, PriceSeries};
use stratbench::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, BacktesterError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktesterError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| BacktesterError::Data {
                reason: format!("no data for {}", symbol),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktesterError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// Consecutive daily bars from 2024-01-01.
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    series_from_closes_at(symbol, date(2024, 1, 1), closes)
}

pub fn series_from_closes_at(symbol: &str, start: NaiveDate, closes: &[f64]) -> PriceSeries {
    let bars: Vec<OhlcvBar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + chrono::Days::new(i as u64), c))
        .collect();
    PriceSeries::from_bars(symbol, &bars).unwrap()
}

/// 15 rows: a steady slide from 100 to 87, then a jump to 105.
pub fn aapl_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..14).map(|i| 100.0 - i as f64).collect();
    closes.push(105.0);
    closes
}

pub fn aapl_fixture() -> PriceSeries {
    series_from_closes("AAPL", &aapl_closes())
}

pub fn dataset_of(series: Vec<PriceSeries>) -> Dataset {
    series.into_iter().collect()
}

/// Write `<symbol>.csv` with one row per close.
pub fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    let start = date(2024, 1, 1);
    for (i, c) in closes.iter().enumerate() {
        let d = start + chrono::Days::new(i as u64);
        content.push_str(&format!(
            "{},{},{},{},{},1000\n",
            d.format("%Y-%m-%d"),
            c - 0.5,
            c + 1.0,
            c - 1.0,
            c
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}

pub const EMA_BELOW_CLOSE: &str =
    r#"Indicator("EMA", stock, time) < Indicator("ClosePrice", stock, time)"#;
