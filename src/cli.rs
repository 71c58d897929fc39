//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, SymbolResult};
use crate::domain::config_validation::{
    DEFAULT_STRATEGY_NAME, load_backtest_config, load_data_config, load_strategy,
};
use crate::domain::error::BacktesterError;
use crate::domain::indicator::{DEFAULT_WINDOW, IndicatorEngine, IndicatorRegistry};
use crate::domain::returns::ReturnSummary;
use crate::domain::rule_parser;
use crate::domain::strategy::Strategy;
use crate::domain::universe::{DataConfig, load_dataset, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Strategy expression backtester")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a strategy program and print its canonical form
    Validate {
        #[arg(short, long)]
        program: String,
    },
    /// Run a backtest described by an INI config
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Program to run instead of [strategy] program
        #[arg(short, long)]
        program: Option<String>,
        /// Comma-separated symbols to run instead of [data] symbols
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// List the symbols available in a data directory
    Symbols {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// List the registered indicator names
    Indicators,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { program } => run_validate(&program),
        Command::Run {
            config,
            program,
            symbol,
        } => run_backtest(&config, program.as_deref(), symbol.as_deref()),
        Command::Symbols { data } => run_symbols(&data),
        Command::Indicators => run_indicators(),
    }
}

fn fail(err: &BacktesterError, program: Option<&str>) -> ExitCode {
    match (err, program) {
        (BacktesterError::Syntax(e), Some(source)) => {
            eprintln!("error: failed to parse program:\n{}", e.display_with_context(source));
        }
        _ => eprintln!("error: {err}"),
    }
    err.into()
}

fn run_validate(program: &str) -> ExitCode {
    match rule_parser::parse(program) {
        Ok(rule) => {
            println!("{}", rule);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&BacktesterError::from(e), Some(program)),
    }
}

fn run_backtest(
    config_path: &Path,
    program_override: Option<&str>,
    symbol_override: Option<&str>,
) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let adapter = match FileConfigAdapter::from_file(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e, None),
    };

    let program_text = program_override
        .map(str::to_string)
        .or_else(|| adapter.get_string("strategy", "program"));

    let strategy = match build_strategy(&adapter, program_override) {
        Ok(s) => s,
        Err(e) => return fail(&e, program_text.as_deref()),
    };
    info!(strategy = %strategy.name, program = %strategy.rule, "strategy parsed");

    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e, None),
    };
    let data_config = match load_data_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e, None),
    };

    let data_port = CsvAdapter::new(data_config.directory.clone());
    let symbols = match resolve_symbols(symbol_override, &data_config, &data_port) {
        Ok(s) => s,
        Err(e) => return fail(&e, None),
    };

    match run_backtest_pipeline(&data_port, &strategy, &bt_config, &symbols) {
        Ok(results) => {
            print_results(&strategy, &results);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e, program_text.as_deref()),
    }
}

/// Strategy from `--program` when given, otherwise from `[strategy]`.
pub fn build_strategy(
    config: &dyn ConfigPort,
    program_override: Option<&str>,
) -> Result<Strategy, BacktesterError> {
    match program_override {
        Some(program) => {
            let name = config
                .get_string("strategy", "name")
                .unwrap_or_else(|| DEFAULT_STRATEGY_NAME.to_string());
            Ok(Strategy::new(name, program)?)
        }
        None => load_strategy(config),
    }
}

/// Symbols from `--symbol`, then `[data] symbols`, then everything the port lists.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    data_config: &DataConfig,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, BacktesterError> {
    if let Some(list) = symbol_override {
        return parse_symbols(list).map_err(|e| BacktesterError::Data {
            reason: format!("--symbol: {}", e),
        });
    }
    if let Some(symbols) = &data_config.symbols {
        return Ok(symbols.clone());
    }
    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        return Err(BacktesterError::NoSymbols);
    }
    Ok(symbols)
}

/// Load, evaluate, simulate and score `symbols`.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    symbols: &[String],
) -> Result<BTreeMap<String, SymbolResult>, BacktesterError> {
    let loaded = load_dataset(data_port, symbols)?;
    if !loaded.skipped.is_empty() {
        info!(
            loaded = loaded.dataset.len(),
            skipped = loaded.skipped.len(),
            "some symbols were skipped"
        );
    }

    let engine = IndicatorEngine::standard(bt_config.window);
    backtest_engine::run_backtest(&strategy.rule, &loaded.dataset, &engine, bt_config)
}

fn print_summary_row(label: &str, s: &ReturnSummary) {
    println!(
        "{:<10} {:>6} {:>9.2}% {:>9.2}% {:>7.1}% {:>9.2}% {:>9.2}%",
        label,
        s.trades,
        s.total * 100.0,
        s.mean * 100.0,
        s.win_rate * 100.0,
        s.best * 100.0,
        s.worst * 100.0,
    );
}

fn print_results(strategy: &Strategy, results: &BTreeMap<String, SymbolResult>) {
    println!("Strategy: {}", strategy.name);
    println!("Program:  {}", strategy.rule);
    println!();
    println!(
        "{:<10} {:>6} {:>10} {:>10} {:>8} {:>10} {:>10}",
        "symbol", "trades", "total", "mean", "win", "best", "worst"
    );
    for (symbol, result) in results {
        print_summary_row(symbol, &result.summary);
    }
    println!();
    print_summary_row("ALL", &backtest_engine::aggregate(results));
}

fn run_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    match adapter.list_symbols() {
        Ok(symbols) => {
            if symbols.is_empty() {
                eprintln!("No symbols found in {}", data_dir.display());
            }
            for symbol in &symbols {
                println!("{}", symbol);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e, None),
    }
}

fn run_indicators() -> ExitCode {
    let registry = IndicatorRegistry::standard(DEFAULT_WINDOW);
    for name in registry.names() {
        println!("{}", name);
    }
    println!("IndQuantile");
    ExitCode::SUCCESS
}
