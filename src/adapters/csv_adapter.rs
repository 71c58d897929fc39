//! CSV directory data adapter.
//!
//! One `<SYMBOL>.csv` file per symbol with a header row and the columns
//! `date,open,high,low,close,volume`. Rows with zero volume or a zero
//! high-low range are dropped as invalid quotes.

use crate::domain::error::BacktesterError;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn field(record: &csv::StringRecord, index: usize, column: &str) -> Result<f64, BacktesterError> {
    record
        .get(index)
        .ok_or_else(|| BacktesterError::Data {
            reason: format!("missing {} column", column),
        })?
        .parse()
        .map_err(|e| BacktesterError::Data {
            reason: format!("invalid {} value: {}", column, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, BacktesterError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| BacktesterError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();
        let mut dropped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| BacktesterError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| BacktesterError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                BacktesterError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            let bar = OhlcvBar {
                date,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: field(&record, 5, "volume")?,
            };

            if bar.volume == 0.0 || bar.high == bar.low {
                dropped += 1;
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        debug!(symbol, bars = bars.len(), dropped, "loaded csv");
        PriceSeries::from_bars(symbol, &bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktesterError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktesterError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktesterError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("CBA.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_returns_sorted_columns() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_series("BHP").unwrap();

        assert_eq!(series.symbol(), "BHP");
        assert_eq!(series.len(), 3);
        assert_eq!(series.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(series.open()[0], 100.0);
        assert_eq!(series.high()[0], 110.0);
        assert_eq!(series.low()[0], 90.0);
        assert_eq!(series.close(), &[105.0, 110.0, 115.0]);
        assert_eq!(series.volume()[0], 50000.0);
    }

    #[test]
    fn fetch_series_drops_invalid_quotes() {
        let dir = TempDir::new().unwrap();
        let content = "date,open,high,low,close,volume\n\
            2024-01-15,100,110,90,105,50000\n\
            2024-01-16,105,105,105,105,60000\n\
            2024-01-17,110,120,105,115,0\n\
            2024-01-18,115,125,110,120,1000\n";
        fs::write(dir.path().join("XYZ.csv"), content).unwrap();

        let series = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_series("XYZ")
            .unwrap();
        assert_eq!(series.close(), &[105.0, 120.0]);
    }

    #[test]
    fn fetch_series_trims_fields() {
        let dir = TempDir::new().unwrap();
        let content = "date, open, high, low, close, volume\n2024-01-15, 1.0, 2.0, 0.5, 1.5, 10\n";
        fs::write(dir.path().join("T.csv"), content).unwrap();

        let series = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_series("T")
            .unwrap();
        assert_eq!(series.close(), &[1.5]);
    }

    #[test]
    fn fetch_series_rejects_duplicate_dates() {
        let dir = TempDir::new().unwrap();
        let content = "date,open,high,low,close,volume\n\
            2024-01-15,1,2,0.5,1.5,10\n\
            2024-01-15,1,2,0.5,1.5,10\n";
        fs::write(dir.path().join("DUP.csv"), content).unwrap();

        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_series("DUP")
            .unwrap_err();
        assert!(matches!(err, BacktesterError::InvalidSeries { .. }));
    }

    #[test]
    fn fetch_series_reports_bad_number() {
        let dir = TempDir::new().unwrap();
        let content = "date,open,high,low,close,volume\n2024-01-15,1,abc,0.5,1.5,10\n";
        fs::write(dir.path().join("BAD.csv"), content).unwrap();

        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_series("BAD")
            .unwrap_err();
        assert!(matches!(err, BacktesterError::Data { ref reason } if reason.contains("high")));
    }

    #[test]
    fn fetch_series_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert!(matches!(
            adapter.fetch_series("XYZ"),
            Err(BacktesterError::Data { .. })
        ));
    }

    #[test]
    fn empty_file_gives_empty_series() {
        let (_dir, path) = setup_test_data();
        let series = CsvAdapter::new(path).fetch_series("CBA").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP", "CBA"]);
    }

    #[test]
    fn list_symbols_errors_for_missing_directory() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/prices"));
        assert!(adapter.list_symbols().is_err());
    }
}
