//! Per-trade returns net of transaction cost, and a per-symbol summary.
//!
//! With c the cost rate, the net exit is exit * (1 - c) and the gross entry is
//! entry * (1 + c).

use super::execution::ExecutionRecord;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    /// (net exit - gross entry) / gross entry
    #[default]
    Simple,
    /// ln(net exit / gross entry)
    Log,
    /// net exit / gross entry
    Ratio,
}

impl FromStr for ReturnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ReturnKind::Simple),
            "log" => Ok(ReturnKind::Log),
            "ratio" | "div" => Ok(ReturnKind::Ratio),
            other => Err(format!(
                "unknown return kind '{}' (expected simple, log or ratio)",
                other
            )),
        }
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReturnKind::Simple => "simple",
            ReturnKind::Log => "log",
            ReturnKind::Ratio => "ratio",
        })
    }
}

fn net_ratio(record: &ExecutionRecord, cost: f64) -> f64 {
    let gross_entry = record.entry_price * (1.0 + cost);
    let net_exit = record.exit_price * (1.0 - cost);
    net_exit / gross_entry
}

pub fn simple_returns(records: &[ExecutionRecord], cost: f64) -> Vec<f64> {
    records.iter().map(|r| net_ratio(r, cost) - 1.0).collect()
}

pub fn log_returns(records: &[ExecutionRecord], cost: f64) -> Vec<f64> {
    records.iter().map(|r| net_ratio(r, cost).ln()).collect()
}

pub fn ratio_returns(records: &[ExecutionRecord], cost: f64) -> Vec<f64> {
    records.iter().map(|r| net_ratio(r, cost)).collect()
}

pub fn returns(records: &[ExecutionRecord], cost: f64, kind: ReturnKind) -> Vec<f64> {
    match kind {
        ReturnKind::Simple => simple_returns(records, cost),
        ReturnKind::Log => log_returns(records, cost),
        ReturnKind::Ratio => ratio_returns(records, cost),
    }
}

/// Aggregate of one symbol's simple returns.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReturnSummary {
    pub trades: usize,
    pub total: f64,
    pub mean: f64,
    pub win_rate: f64,
    pub best: f64,
    pub worst: f64,
}

impl ReturnSummary {
    /// Summary of simple returns. An empty slice gives all zeros.
    pub fn compute(returns: &[f64]) -> Self {
        if returns.is_empty() {
            return Self::default();
        }
        let trades = returns.len();
        let total: f64 = returns.iter().sum();
        let wins = returns.iter().filter(|r| **r > 0.0).count();
        ReturnSummary {
            trades,
            total,
            mean: total / trades as f64,
            win_rate: wins as f64 / trades as f64,
            best: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst: returns.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    /// Pool several symbols' summaries into one.
    pub fn combine<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a ReturnSummary>,
    {
        let mut out = ReturnSummary::default();
        let mut wins = 0.0;
        let mut first = true;
        for s in summaries.into_iter().filter(|s| s.trades > 0) {
            out.trades += s.trades;
            out.total += s.total;
            wins += s.win_rate * s.trades as f64;
            if first {
                out.best = s.best;
                out.worst = s.worst;
                first = false;
            } else {
                out.best = out.best.max(s.best);
                out.worst = out.worst.min(s.worst);
            }
        }
        if out.trades > 0 {
            out.mean = out.total / out.trades as f64;
            out.win_rate = wins / out.trades as f64;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::ExitReason;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn record(entry: f64, exit: f64) -> ExecutionRecord {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ExecutionRecord {
            entry_index: 0,
            entry_date: d,
            entry_price: entry,
            exit_index: 1,
            exit_date: d,
            exit_price: exit,
            reason: ExitReason::Signal,
        }
    }

    #[test]
    fn simple_returns_without_cost() {
        let r = simple_returns(&[record(100.0, 110.0), record(50.0, 45.0)], 0.0);
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn simple_returns_with_cost() {
        let r = simple_returns(&[record(100.0, 110.0)], 0.01);
        let expected = (110.0 * 0.99 - 100.0 * 1.01) / (100.0 * 1.01);
        assert_relative_eq!(r[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn flat_trade_loses_cost() {
        let r = simple_returns(&[record(100.0, 100.0)], 0.05);
        assert!(r[0] < 0.0);
    }

    #[test]
    fn empty_input_empty_output() {
        assert!(simple_returns(&[], 0.05).is_empty());
        assert!(log_returns(&[], 0.05).is_empty());
        assert!(ratio_returns(&[], 0.05).is_empty());
    }

    #[test]
    fn log_and_ratio_agree() {
        let records = [record(100.0, 120.0)];
        let ratio = ratio_returns(&records, 0.002)[0];
        let log = log_returns(&records, 0.002)[0];
        assert_relative_eq!(log, ratio.ln(), epsilon = 1e-12);
        assert_relative_eq!(ratio - 1.0, simple_returns(&records, 0.002)[0], epsilon = 1e-12);
    }

    #[test]
    fn return_kind_from_str() {
        assert_eq!("simple".parse::<ReturnKind>().unwrap(), ReturnKind::Simple);
        assert_eq!(" LOG ".parse::<ReturnKind>().unwrap(), ReturnKind::Log);
        assert_eq!("div".parse::<ReturnKind>().unwrap(), ReturnKind::Ratio);
        assert!("compound".parse::<ReturnKind>().is_err());
    }

    #[test]
    fn summary_basic() {
        let s = ReturnSummary::compute(&[0.1, -0.05, 0.2, 0.0]);
        assert_eq!(s.trades, 4);
        assert_relative_eq!(s.total, 0.25, epsilon = 1e-12);
        assert_relative_eq!(s.mean, 0.0625, epsilon = 1e-12);
        assert_relative_eq!(s.win_rate, 0.5);
        assert_relative_eq!(s.best, 0.2);
        assert_relative_eq!(s.worst, -0.05);
    }

    #[test]
    fn summary_empty() {
        assert_eq!(ReturnSummary::compute(&[]), ReturnSummary::default());
    }

    #[test]
    fn combine_pools_trades() {
        let a = ReturnSummary::compute(&[0.1, -0.1]);
        let b = ReturnSummary::compute(&[0.3]);
        let empty = ReturnSummary::default();
        let all = ReturnSummary::combine([&a, &b, &empty]);
        assert_eq!(all.trades, 3);
        assert_relative_eq!(all.total, 0.3, epsilon = 1e-12);
        assert_relative_eq!(all.win_rate, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(all.best, 0.3);
        assert_relative_eq!(all.worst, -0.1);
    }
}
