//! Strategy program evaluation.
//!
//! # Evaluation Semantics
//!
//! - Every indicator call is resolved up front against the registry and the
//!   dataset; unknown names, bad arguments and unknown symbols fail the whole run
//! - At index t the program is `false` unless every call has enough history
//!   (look-back plus lag) at t
//! - `and` short-circuits on the first `false`, `or` on the first `true`
//! - `==` / `!=` compare within `EPSILON`; a NaN operand makes any comparison `false`
//! - Other-symbol calls read the row with the same date; a missing date counts
//!   as not enough history

use crate::domain::dataset::{Dataset, StockData};
use crate::domain::error::BacktesterError;
use crate::domain::indicator::IndicatorEngine;
use crate::domain::indicator_table::Column;
use crate::domain::rule::{CallKind, CompareOp, IndicatorCall, Operand, Rule, SymbolRef};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

const EPSILON: f64 = 1e-9;

pub type SignalSequence = Vec<bool>;

/// Signal for every index of `symbol`'s series.
pub fn evaluate(
    rule: &Rule,
    symbol: &str,
    dataset: &Dataset,
    engine: &IndicatorEngine,
) -> Result<SignalSequence, BacktesterError> {
    let current = dataset.get(symbol)?;
    let program = Compiled::new(rule, current, dataset, engine)?;
    let signals: SignalSequence = (0..current.len()).map(|t| program.signal(t)).collect();
    debug!(
        symbol = %symbol,
        bars = signals.len(),
        true_signals = signals.iter().filter(|s| **s).count(),
        "evaluated strategy"
    );
    Ok(signals)
}

/// `evaluate` for every symbol in the dataset, in parallel.
pub fn evaluate_all(
    rule: &Rule,
    dataset: &Dataset,
    engine: &IndicatorEngine,
) -> Result<BTreeMap<String, SignalSequence>, BacktesterError> {
    dataset
        .stocks()
        .par_iter()
        .map(|(symbol, _)| {
            evaluate(rule, symbol, dataset, engine).map(|signals| (symbol.clone(), signals))
        })
        .collect()
}

/// A call bound to its source column for one evaluated symbol.
struct BoundCall {
    column: Column,
    lookback: usize,
    lag: usize,
    /// Row in the source series for each row of the evaluated symbol; `None` for the symbol itself.
    alignment: Option<Vec<Option<usize>>>,
}

impl BoundCall {
    fn bind(
        call: &IndicatorCall,
        current: &StockData,
        dataset: &Dataset,
        engine: &IndicatorEngine,
    ) -> Result<Self, BacktesterError> {
        let source = match &call.symbol {
            SymbolRef::Current => current,
            SymbolRef::Named(symbol) => dataset.get(symbol)?,
        };
        let (lookback, column) = match call.kind {
            CallKind::Point => (
                engine.lookback(&call.name, &call.args)?,
                engine.series(&call.name, &call.args, source)?,
            ),
            CallKind::Quantile { q } => (
                engine.quantile_lookback(&call.name, q, &call.args)?,
                engine.quantile_series(&call.name, q, &call.args, source)?,
            ),
        };
        let alignment = match call.symbol {
            SymbolRef::Current => None,
            SymbolRef::Named(_) => Some(
                current
                    .series()
                    .dates()
                    .iter()
                    .map(|d| source.index_of(*d))
                    .collect(),
            ),
        };
        Ok(Self {
            column,
            lookback,
            lag: call.time.lag,
            alignment,
        })
    }

    /// Value at row `t` of the evaluated symbol, or `None` without enough history.
    fn value_at(&self, t: usize) -> Option<f64> {
        let row = match &self.alignment {
            None => t,
            Some(rows) => (*rows.get(t)?)?,
        };
        // a lag too large to add is never satisfied
        if row < self.lookback.checked_add(self.lag)? {
            return None;
        }
        self.column.get(row - self.lag).copied()
    }
}

#[derive(Debug)]
enum Leaf {
    Literal(f64),
    Call(usize),
}

#[derive(Debug)]
enum Node {
    Compare { op: CompareOp, left: Leaf, right: Leaf },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
}

/// A rule whose calls are bound to columns of one symbol.
struct Compiled {
    root: Node,
    calls: Vec<BoundCall>,
}

impl Compiled {
    fn new(
        rule: &Rule,
        current: &StockData,
        dataset: &Dataset,
        engine: &IndicatorEngine,
    ) -> Result<Self, BacktesterError> {
        let mut calls = Vec::new();
        let root = Self::compile(rule, current, dataset, engine, &mut calls)?;
        Ok(Self { root, calls })
    }

    fn compile(
        rule: &Rule,
        current: &StockData,
        dataset: &Dataset,
        engine: &IndicatorEngine,
        calls: &mut Vec<BoundCall>,
    ) -> Result<Node, BacktesterError> {
        let leaf = |operand: &Operand, calls: &mut Vec<BoundCall>| -> Result<Leaf, BacktesterError> {
            match operand {
                Operand::Literal(v) => Ok(Leaf::Literal(*v)),
                Operand::Call(call) => {
                    calls.push(BoundCall::bind(call, current, dataset, engine)?);
                    Ok(Leaf::Call(calls.len() - 1))
                }
            }
        };
        Ok(match rule {
            Rule::Comparison { op, left, right } => Node::Compare {
                op: *op,
                left: leaf(left, calls)?,
                right: leaf(right, calls)?,
            },
            Rule::And(rules) => Node::And(
                rules
                    .iter()
                    .map(|r| Self::compile(r, current, dataset, engine, calls))
                    .collect::<Result<_, _>>()?,
            ),
            Rule::Or(rules) => Node::Or(
                rules
                    .iter()
                    .map(|r| Self::compile(r, current, dataset, engine, calls))
                    .collect::<Result<_, _>>()?,
            ),
            Rule::Not(rule) => Node::Not(Box::new(Self::compile(
                rule, current, dataset, engine, calls,
            )?)),
        })
    }

    fn signal(&self, t: usize) -> bool {
        let values: Option<Vec<f64>> = self.calls.iter().map(|c| c.value_at(t)).collect();
        match values {
            Some(values) => eval_node(&self.root, &values),
            None => false,
        }
    }
}

fn eval_node(node: &Node, values: &[f64]) -> bool {
    match node {
        Node::Compare { op, left, right } => {
            let l = leaf_value(left, values);
            let r = leaf_value(right, values);
            compare(*op, l, r)
        }
        Node::And(nodes) => nodes.iter().all(|n| eval_node(n, values)),
        Node::Or(nodes) => nodes.iter().any(|n| eval_node(n, values)),
        Node::Not(node) => !eval_node(node, values),
    }
}

fn leaf_value(leaf: &Leaf, values: &[f64]) -> f64 {
    match leaf {
        Leaf::Literal(v) => *v,
        Leaf::Call(i) => values[*i],
    }
}

fn compare(op: CompareOp, l: f64, r: f64) -> bool {
    if l.is_nan() || r.is_nan() {
        return false;
    }
    match op {
        CompareOp::Lt => l < r,
        CompareOp::Gt => l > r,
        CompareOp::Le => l <= r,
        CompareOp::Ge => l >= r,
        CompareOp::Eq => (l - r).abs() < EPSILON,
        CompareOp::Ne => (l - r).abs() >= EPSILON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::IndicatorError;
    use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
    use crate::domain::rule_parser::parse;
    use chrono::NaiveDate;

    fn series_from(symbol: &str, start_day: u32, closes: &[f64]) -> PriceSeries {
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, start_day + i as u32).unwrap(),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::from_bars(symbol, &bars).unwrap()
    }

    fn dataset(entries: &[(&str, u32, &[f64])]) -> Dataset {
        entries
            .iter()
            .map(|(s, d, c)| series_from(s, *d, c))
            .collect()
    }

    #[test]
    fn literal_comparison() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"Indicator("ClosePrice", stock, time) > 1.5"#).unwrap();
        assert_eq!(evaluate(&rule, "BHP", &ds, &engine).unwrap(), vec![false, true, true]);
    }

    #[test]
    fn warmup_is_false() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0, 4.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"Indicator("SMA", stock, time) > 0"#).unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false, false, true, true]
        );
    }

    #[test]
    fn not_of_warmup_is_still_false() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"not Indicator("SMA", stock, time) < 0"#).unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false, false, true]
        );
    }

    #[test]
    fn lag_extends_warmup() {
        let ds = dataset(&[("BHP", 1, &[1.0, 5.0, 2.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(
            r#"Indicator("ClosePrice", stock, time - 1) > Indicator("ClosePrice", stock, time)"#,
        )
        .unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false, false, true]
        );
    }

    #[test]
    fn lag_beyond_usize_is_never_satisfied() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0, 4.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(&format!(
            r#"Indicator("SMA", stock, time - {}) > 1"#,
            usize::MAX
        ))
        .unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false; 4]
        );
    }

    #[test]
    fn and_or_short_circuit_semantics() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(
            r#"Indicator("ClosePrice", stock, time) > 1 and Indicator("ClosePrice", stock, time) < 3 or Indicator("ClosePrice", stock, time) == 1"#,
        )
        .unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![true, true, false]
        );
    }

    #[test]
    fn equality_within_epsilon() {
        assert!(compare(CompareOp::Eq, 1.0, 1.0 + 1e-12));
        assert!(!compare(CompareOp::Ne, 1.0, 1.0 + 1e-12));
        assert!(compare(CompareOp::Ne, 1.0, 1.1));
    }

    #[test]
    fn nan_comparisons_are_false() {
        for op in [
            CompareOp::Lt,
            CompareOp::Gt,
            CompareOp::Le,
            CompareOp::Ge,
            CompareOp::Eq,
            CompareOp::Ne,
        ] {
            assert!(!compare(op, f64::NAN, 1.0));
        }
    }

    #[test]
    fn unknown_indicator_fails_evaluation() {
        let ds = dataset(&[("BHP", 1, &[1.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"Indicator("NOPE", stock, time) > 1"#).unwrap();
        let err = evaluate(&rule, "BHP", &ds, &engine).unwrap_err();
        assert!(matches!(
            err,
            BacktesterError::Indicator(IndicatorError::UnknownIndicator { .. })
        ));
    }

    #[test]
    fn unknown_indicator_fails_even_when_short_circuited() {
        let ds = dataset(&[("BHP", 1, &[1.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"1 > 2 and Indicator("NOPE", stock, time) > 1"#).unwrap();
        assert!(evaluate(&rule, "BHP", &ds, &engine).is_err());
    }

    #[test]
    fn invalid_quantile_fails_evaluation() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0])]);
        let engine = IndicatorEngine::standard(2);
        let rule = parse(r#"IndQuantile("ClosePrice", 1.5, stock, time) > 1"#).unwrap();
        let err = evaluate(&rule, "BHP", &ds, &engine).unwrap_err();
        assert!(matches!(
            err,
            BacktesterError::Indicator(IndicatorError::InvalidQuantile { .. })
        ));
    }

    #[test]
    fn invalid_symbol() {
        let ds = dataset(&[("BHP", 1, &[1.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse("1 < 2").unwrap();
        let err = evaluate(&rule, "RIO", &ds, &engine).unwrap_err();
        assert!(matches!(err, BacktesterError::InvalidSymbol { .. }));

        let rule = parse(r#"Indicator("ClosePrice", "RIO", time) > 1"#).unwrap();
        let err = evaluate(&rule, "BHP", &ds, &engine).unwrap_err();
        assert!(matches!(err, BacktesterError::InvalidSymbol { ref symbol } if symbol == "RIO"));
    }

    #[test]
    fn other_symbol_aligned_by_date() {
        // SPY starts a day later than BHP
        let ds = dataset(&[("BHP", 1, &[10.0, 10.0, 10.0]), ("SPY", 2, &[5.0, 20.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"Indicator("ClosePrice", "SPY", time) > Indicator("ClosePrice", stock, time)"#)
            .unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false, false, true]
        );
    }

    #[test]
    fn quantile_signal() {
        let ds = dataset(&[("BHP", 1, &[1.0, 2.0, 3.0, 10.0])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(
            r#"Indicator("ClosePrice", stock, time) > IndQuantile("ClosePrice", 0.5, stock, time)"#,
        )
        .unwrap();
        assert_eq!(
            evaluate(&rule, "BHP", &ds, &engine).unwrap(),
            vec![false, false, true, true]
        );
    }

    #[test]
    fn evaluate_all_matches_single() {
        let ds = dataset(&[
            ("AAA", 1, &[1.0, 3.0, 2.0, 4.0]),
            ("BBB", 1, &[4.0, 3.0, 2.0, 1.0]),
            ("CCC", 3, &[2.0, 2.0]),
        ]);
        let engine = IndicatorEngine::standard(2);
        let rule = parse(r#"Indicator("EMA", stock, time) < Indicator("ClosePrice", stock, time)"#)
            .unwrap();
        let all = evaluate_all(&rule, &ds, &engine).unwrap();
        assert_eq!(all.len(), 3);
        for symbol in ds.symbols() {
            assert_eq!(all[symbol], evaluate(&rule, symbol, &ds, &engine).unwrap());
        }
    }

    #[test]
    fn empty_series_gives_empty_signals() {
        let ds = dataset(&[("BHP", 1, &[])]);
        let engine = IndicatorEngine::standard(3);
        let rule = parse(r#"Indicator("EMA", stock, time) > 1"#).unwrap();
        assert!(evaluate(&rule, "BHP", &ds, &engine).unwrap().is_empty());
    }
}
