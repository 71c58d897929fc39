//! Trade execution simulation.
//!
//! Turns a signal sequence into completed long trades. Entries and exits fill
//! at the close. While in a position, each later bar is checked in order:
//! stop-loss, profit-take, trailing stop, max hold, then signal reversal.
//! At most one position is open at a time; re-entry starts on the bar after an exit.

use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, warn};

use super::ohlcv::PriceSeries;

/// Exit conditions for an open position.
///
/// Fractions are relative to the entry price (stop-loss, profit-take) or the
/// highest close since entry (trailing stop). `None` disables a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitRules {
    pub stop_loss: f64,
    pub profit_take: f64,
    pub trailing_stop: Option<f64>,
    pub max_hold: Option<usize>,
    pub exit_on_signal: bool,
}

impl ExitRules {
    /// Stop-loss / profit-take rules. A negative `trailing_stop` or `max_hold` disables it.
    pub fn new(stop_loss: f64, profit_take: f64, trailing_stop: f64, max_hold: i64) -> Self {
        ExitRules {
            stop_loss,
            profit_take,
            trailing_stop: (trailing_stop >= 0.0).then_some(trailing_stop),
            max_hold: usize::try_from(max_hold).ok(),
            exit_on_signal: true,
        }
    }

    /// Hold while the signal stays true.
    pub fn market_timing() -> Self {
        ExitRules {
            stop_loss: f64::INFINITY,
            profit_take: f64::INFINITY,
            trailing_stop: None,
            max_hold: None,
            exit_on_signal: true,
        }
    }

    /// Exit exactly `bars` bars after entry regardless of the signal.
    pub fn time_stop(bars: usize) -> Self {
        ExitRules {
            stop_loss: f64::INFINITY,
            profit_take: f64::INFINITY,
            trailing_stop: None,
            max_hold: Some(bars),
            exit_on_signal: false,
        }
    }
}

impl Default for ExitRules {
    fn default() -> Self {
        Self::market_timing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitReason {
    Signal,
    StopLoss,
    ProfitTake,
    TrailingStop,
    MaxHold,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop-loss",
            ExitReason::ProfitTake => "profit-take",
            ExitReason::TrailingStop => "trailing-stop",
            ExitReason::MaxHold => "max-hold",
            ExitReason::EndOfData => "end-of-data",
        };
        f.write_str(s)
    }
}

/// One completed trade.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionRecord {
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub reason: ExitReason,
}

impl ExecutionRecord {
    /// Bars between entry and exit.
    pub fn holding_period(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

struct OpenPosition {
    entry_index: usize,
    entry_price: f64,
    peak: f64,
}

/// Simulate long trades for one symbol.
///
/// If `signals` and `series` differ in length, only the common prefix is used.
pub fn simulate(signals: &[bool], series: &PriceSeries, rules: &ExitRules) -> Vec<ExecutionRecord> {
    let len = signals.len().min(series.len());
    if signals.len() != series.len() {
        warn!(
            symbol = %series.symbol(),
            signals = signals.len(),
            bars = series.len(),
            "signal and price lengths differ; simulating common prefix"
        );
    }

    let closes = series.close();
    let dates = series.dates();
    let mut records = Vec::new();
    let mut open: Option<OpenPosition> = None;

    for t in 0..len {
        let price = closes[t];
        match open.as_mut() {
            None => {
                if signals[t] {
                    open = Some(OpenPosition {
                        entry_index: t,
                        entry_price: price,
                        peak: price,
                    });
                }
            }
            Some(pos) => {
                pos.peak = pos.peak.max(price);
                if let Some(reason) = exit_reason(pos, t, price, signals[t], rules) {
                    records.push(close_position(pos, t, price, dates, reason));
                    open = None;
                }
            }
        }
    }

    if let Some(pos) = open {
        let last = len - 1;
        records.push(close_position(&pos, last, closes[last], dates, ExitReason::EndOfData));
    }

    debug!(symbol = %series.symbol(), trades = records.len(), "simulated trades");
    records
}

fn exit_reason(
    pos: &OpenPosition,
    t: usize,
    price: f64,
    signal: bool,
    rules: &ExitRules,
) -> Option<ExitReason> {
    if price <= pos.entry_price * (1.0 - rules.stop_loss) {
        return Some(ExitReason::StopLoss);
    }
    if price >= pos.entry_price * (1.0 + rules.profit_take) {
        return Some(ExitReason::ProfitTake);
    }
    if let Some(trail) = rules.trailing_stop {
        if price <= pos.peak * (1.0 - trail) {
            return Some(ExitReason::TrailingStop);
        }
    }
    if let Some(max_hold) = rules.max_hold {
        if t - pos.entry_index >= max_hold {
            return Some(ExitReason::MaxHold);
        }
    }
    if rules.exit_on_signal && !signal {
        return Some(ExitReason::Signal);
    }
    None
}

fn close_position(
    pos: &OpenPosition,
    t: usize,
    price: f64,
    dates: &[NaiveDate],
    reason: ExitReason,
) -> ExecutionRecord {
    ExecutionRecord {
        entry_index: pos.entry_index,
        entry_date: dates[pos.entry_index],
        entry_price: pos.entry_price,
        exit_index: t,
        exit_date: dates[t],
        exit_price: price,
        reason,
    }
}

/// Stop-loss / profit-take backtest; `-1` (any negative) disables the trailing stop or max hold.
pub fn backtest_stoploss_profittake(
    signals: &[bool],
    series: &PriceSeries,
    stop_loss: f64,
    profit_take: f64,
    trailing_stop: f64,
    max_hold: i64,
) -> Vec<ExecutionRecord> {
    simulate(
        signals,
        series,
        &ExitRules::new(stop_loss, profit_take, trailing_stop, max_hold),
    )
}

pub fn backtest_market_timing(signals: &[bool], series: &PriceSeries) -> Vec<ExecutionRecord> {
    simulate(signals, series, &ExitRules::market_timing())
}

pub fn backtest_time_stop(signals: &[bool], series: &PriceSeries, bars: usize) -> Vec<ExecutionRecord> {
    simulate(signals, series, &ExitRules::time_stop(bars))
}
