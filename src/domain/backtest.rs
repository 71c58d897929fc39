//! Multi-symbol backtest: evaluate, simulate and compute returns per symbol.

use crate::domain::dataset::Dataset;
use crate::domain::error::BacktesterError;
use crate::domain::execution::{ExecutionRecord, ExitRules, simulate};
use crate::domain::indicator::{DEFAULT_WINDOW, IndicatorEngine};
use crate::domain::returns::{self, ReturnKind, ReturnSummary};
use crate::domain::rule::Rule;
use crate::domain::rule_eval::{SignalSequence, evaluate_all};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Default look-back window for windowed indicators.
    pub window: usize,
    pub exit_rules: ExitRules,
    /// Fraction charged on both entry and exit.
    pub transaction_cost: f64,
    pub returns: ReturnKind,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            exit_rules: ExitRules::market_timing(),
            transaction_cost: 0.0,
            returns: ReturnKind::Simple,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResult {
    pub signals: SignalSequence,
    pub records: Vec<ExecutionRecord>,
    /// One value per record, of the configured kind.
    pub returns: Vec<f64>,
    /// Computed from simple returns whatever the configured kind.
    pub summary: ReturnSummary,
}

/// Run `rule` over every symbol of `dataset`.
pub fn run_backtest(
    rule: &Rule,
    dataset: &Dataset,
    engine: &IndicatorEngine,
    config: &BacktestConfig,
) -> Result<BTreeMap<String, SymbolResult>, BacktesterError> {
    let signals = evaluate_all(rule, dataset, engine)?;

    let results: BTreeMap<String, SymbolResult> = signals
        .into_par_iter()
        .map(|(symbol, signals)| -> Result<(String, SymbolResult), BacktesterError> {
            let data = dataset.get(&symbol)?;
            let records = simulate(&signals, data.series(), &config.exit_rules);
            let returns = returns::returns(&records, config.transaction_cost, config.returns);
            let summary = ReturnSummary::compute(&returns::simple_returns(
                &records,
                config.transaction_cost,
            ));
            Ok((
                symbol,
                SymbolResult {
                    signals,
                    records,
                    returns,
                    summary,
                },
            ))
        })
        .collect::<Result<_, _>>()?;

    let overall = aggregate(&results);
    info!(
        symbols = results.len(),
        trades = overall.trades,
        mean_return = overall.mean,
        "backtest complete"
    );
    Ok(results)
}

/// Pooled summary over every symbol's trades.
pub fn aggregate(results: &BTreeMap<String, SymbolResult>) -> ReturnSummary {
    ReturnSummary::combine(results.values().map(|r| &r.summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::ExitReason;
    use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
    use crate::domain::rule_parser::parse;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar {
                date: start + chrono::Days::new(i as u64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::from_bars(symbol, &bars).unwrap()
    }

    fn dataset() -> Dataset {
        [
            series("UP", &[10.0, 11.0, 12.0, 13.0, 12.0, 11.0]),
            series("FLAT", &[5.0, 5.0, 5.0, 5.0]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn runs_every_symbol() {
        let rule = parse(r#"Indicator("ClosePrice", stock, time) > 10.5"#).unwrap();
        let engine = IndicatorEngine::standard(3);
        let results = run_backtest(&rule, &dataset(), &engine, &BacktestConfig::default()).unwrap();

        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["FLAT", "UP"]);

        let up = &results["UP"];
        assert_eq!(up.signals, vec![false, true, true, true, true, true]);
        assert_eq!(up.records.len(), 1);
        assert_eq!(up.records[0].entry_index, 1);
        assert_eq!(up.records[0].reason, ExitReason::EndOfData);
        assert_relative_eq!(up.returns[0], 0.0, epsilon = 1e-12);

        let flat = &results["FLAT"];
        assert!(flat.records.is_empty());
        assert!(flat.returns.is_empty());
        assert_eq!(flat.summary, ReturnSummary::default());
    }

    #[test]
    fn returns_follow_configured_kind() {
        let rule = parse(r#"Indicator("ClosePrice", stock, time) < 12.5"#).unwrap();
        let engine = IndicatorEngine::standard(3);
        let config = BacktestConfig {
            returns: ReturnKind::Ratio,
            ..BacktestConfig::default()
        };
        let results = run_backtest(&rule, &dataset(), &engine, &config).unwrap();

        let up = &results["UP"];
        assert_eq!(up.records.len(), 2);
        // 10 -> 13 exits on the signal, then 12 -> 11 re-entry held to the end.
        assert_relative_eq!(up.returns[0], 1.3, epsilon = 1e-12);
        assert_relative_eq!(up.summary.best, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn unknown_indicator_fails_whole_run() {
        let rule = parse(r#"Indicator("Nope", stock, time) > 1"#).unwrap();
        let engine = IndicatorEngine::standard(3);
        let err = run_backtest(&rule, &dataset(), &engine, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, BacktesterError::Indicator(_)));
    }

    #[test]
    fn aggregate_pools_symbols() {
        let rule = parse(r#"Indicator("ClosePrice", stock, time) > 0"#).unwrap();
        let engine = IndicatorEngine::standard(3);
        let results = run_backtest(&rule, &dataset(), &engine, &BacktestConfig::default()).unwrap();
        let all = aggregate(&results);
        assert_eq!(all.trades, 2);
        assert_relative_eq!(all.total, 0.1, epsilon = 1e-12);
    }
}
