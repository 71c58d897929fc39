//! Symbol universe: parses symbol lists and loads their price series into a dataset.

use crate::domain::dataset::Dataset;
use crate::domain::error::BacktesterError;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Where price data lives and which symbols to load from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub directory: PathBuf,
    /// `None` loads every symbol the data source lists.
    pub symbols: Option<Vec<String>>,
}

/// Split a comma list into trimmed, upper-cased symbols.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    LoadFailed(String),
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct LoadedUniverse {
    pub dataset: Dataset,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetch every symbol through `port`. Symbols that fail to load or have no
/// rows are skipped; an empty result is an error.
pub fn load_dataset(
    port: &dyn DataPort,
    symbols: &[String],
) -> Result<LoadedUniverse, BacktesterError> {
    let mut dataset = Dataset::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let series = match port.fetch_series(symbol) {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::LoadFailed(e.to_string()),
                });
                continue;
            }
        };

        if series.is_empty() {
            warn!(symbol = %symbol, "skipping symbol with no data");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        debug!(symbol = %symbol, bars = series.len(), "symbol loaded");
        dataset.insert(series);
    }

    if dataset.is_empty() {
        return Err(BacktesterError::NoSymbols);
    }

    Ok(LoadedUniverse { dataset, skipped })
}
