//! Configuration validation.
//!
//! Reads the `[data]`, `[indicators]`, `[strategy]` and `[backtest]` sections
//! into typed values, rejecting anything malformed before a run starts.
//! Risk parameter ranges are not checked; any number is a valid stop.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::BacktesterError;
use crate::domain::execution::ExitRules;
use crate::domain::indicator::DEFAULT_WINDOW;
use crate::domain::returns::ReturnKind;
use crate::domain::strategy::Strategy;
use crate::domain::universe::{DataConfig, parse_symbols};
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_STRATEGY_NAME: &str = "Unnamed";

pub fn load_data_config(config: &dyn ConfigPort) -> Result<DataConfig, BacktesterError> {
    let directory = config
        .get_string("data", "directory")
        .ok_or_else(|| BacktesterError::ConfigMissing {
            section: "data".to_string(),
            key: "directory".to_string(),
        })?;

    let symbols = match config.get_string("data", "symbols") {
        Some(list) => Some(parse_symbols(&list).map_err(|e| BacktesterError::ConfigInvalid {
            section: "data".to_string(),
            key: "symbols".to_string(),
            reason: e.to_string(),
        })?),
        None => None,
    };

    Ok(DataConfig {
        directory: PathBuf::from(directory),
        symbols,
    })
}

/// Strategy from `[strategy]`. A missing program is a config error; a malformed one a syntax error.
pub fn load_strategy(config: &dyn ConfigPort) -> Result<Strategy, BacktesterError> {
    let program = config
        .get_string("strategy", "program")
        .ok_or_else(|| BacktesterError::ConfigMissing {
            section: "strategy".to_string(),
            key: "program".to_string(),
        })?;
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| DEFAULT_STRATEGY_NAME.to_string());
    Ok(Strategy::new(name, program)?)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktesterError> {
    Ok(BacktestConfig {
        window: validate_window(config)?,
        exit_rules: validate_exit_rules(config)?,
        transaction_cost: validate_transaction_cost(config)?,
        returns: validate_returns(config)?,
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktesterError {
    BacktesterError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), BacktesterError> {
    match config.get_string(section, key) {
        Some(raw) if raw.parse::<f64>().is_err() => {
            Err(invalid(section, key, format!("'{}' is not a number", raw)))
        }
        _ => Ok(()),
    }
}

fn require_integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), BacktesterError> {
    match config.get_string(section, key) {
        Some(raw) if raw.parse::<i64>().is_err() => {
            Err(invalid(section, key, format!("'{}' is not a whole number", raw)))
        }
        _ => Ok(()),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<usize, BacktesterError> {
    require_integer(config, "indicators", "window")?;
    let window = config.get_int("indicators", "window", DEFAULT_WINDOW as i64);
    if window < 1 {
        return Err(invalid("indicators", "window", "window must be at least 1"));
    }
    usize::try_from(window).map_err(|_| invalid("indicators", "window", "window is too large"))
}

fn validate_exit_rules(config: &dyn ConfigPort) -> Result<ExitRules, BacktesterError> {
    for key in ["stop_loss", "profit_take", "trailing_stop"] {
        require_number(config, "backtest", key)?;
    }
    require_integer(config, "backtest", "max_hold")?;

    // A value that parses as a bool reads the same whatever the default.
    let exit_on_signal_set = config.get_string("backtest", "exit_on_signal").is_some();
    let parsed_true = config.get_bool("backtest", "exit_on_signal", true);
    if exit_on_signal_set && parsed_true != config.get_bool("backtest", "exit_on_signal", false) {
        return Err(invalid(
            "backtest",
            "exit_on_signal",
            "expected true or false",
        ));
    }

    let mut rules = ExitRules::new(
        config.get_double("backtest", "stop_loss", f64::INFINITY),
        config.get_double("backtest", "profit_take", f64::INFINITY),
        config.get_double("backtest", "trailing_stop", -1.0),
        config.get_int("backtest", "max_hold", -1),
    );
    rules.exit_on_signal = parsed_true;
    Ok(rules)
}

fn validate_transaction_cost(config: &dyn ConfigPort) -> Result<f64, BacktesterError> {
    require_number(config, "backtest", "transaction_cost")?;
    let cost = config.get_double("backtest", "transaction_cost", 0.0);
    if !(0.0..1.0).contains(&cost) {
        return Err(invalid(
            "backtest",
            "transaction_cost",
            "transaction_cost must be within [0, 1)",
        ));
    }
    Ok(cost)
}

fn validate_returns(config: &dyn ConfigPort) -> Result<ReturnKind, BacktesterError> {
    match config.get_string("backtest", "returns") {
        Some(raw) => raw
            .parse::<ReturnKind>()
            .map_err(|reason| invalid("backtest", "returns", reason)),
        None => Ok(ReturnKind::default()),
    }
}
