//! Core domain types and logic.

pub mod ohlcv;
pub mod dataset;
pub mod indicator;
pub mod indicator_helpers;
pub mod indicator_table;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod execution;
pub mod returns;
pub mod backtest;
pub mod strategy;
pub mod universe;
pub mod config_validation;
pub mod error;
