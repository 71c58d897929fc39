//! Indicator engine.
//!
//! - `Indicator`: capability implemented by every named indicator
//! - `IndicatorRegistry`: name -> indicator lookup, extensible at runtime
//! - `IndicatorEngine`: memoized column computation and direct point queries
//!
//! Every indicator computes a whole column aligned to the series index. Element
//! t may only depend on data at indices `<= t`; warm-up cells are NaN.

pub mod ema;
pub mod mfi;
pub mod obv;
pub mod price;
pub mod quantile;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod vwap;

use crate::domain::dataset::StockData;
use crate::domain::error::IndicatorError;
use crate::domain::indicator_helpers::window_arg;
use crate::domain::indicator_table::Column;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::rule::{Arg, series_key};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_WINDOW: usize = 40;

pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    /// Number of preceding indices needed before index t has a value.
    fn lookback(&self, args: &[Arg]) -> Result<usize, IndicatorError>;

    /// Full column for `series`, same length as the series.
    fn compute(&self, series: &PriceSeries, args: &[Arg]) -> Result<Vec<f64>, IndicatorError>;
}

pub struct IndicatorRegistry {
    default_window: usize,
    indicators: BTreeMap<String, Box<dyn Indicator>>,
}

impl IndicatorRegistry {
    /// Empty registry; windowed indicators registered later should use `default_window`.
    pub fn new(default_window: usize) -> Self {
        Self {
            default_window,
            indicators: BTreeMap::new(),
        }
    }

    /// Registry with every built-in indicator.
    pub fn standard(default_window: usize) -> Self {
        let w = default_window;
        let mut registry = Self::new(w);
        for field in price::PriceField::ALL {
            registry.register(field);
        }
        registry.register_alias(
            price::MISSPELLED_PERCENT_CHANGE,
            price::PriceField::PercentChangeOpenToClose,
        );
        registry.register(ema::Ema { default_window: w });
        registry.register(sma::Sma { default_window: w });
        registry.register(rsi::Rsi { default_window: w });
        registry.register(vwap::Vwap { default_window: w });
        registry.register(obv::Obv { default_window: w });
        registry.register(roc::Roc { default_window: w });
        registry.register(mfi::Mfi { default_window: w });
        registry
    }

    /// Add or replace an indicator under its own name.
    pub fn register<I: Indicator + 'static>(&mut self, indicator: I) {
        self.indicators
            .insert(indicator.name().to_string(), Box::new(indicator));
    }

    /// Add `indicator` under an extra name as well as its own.
    pub fn register_alias<I: Indicator + 'static>(&mut self, alias: &str, indicator: I) {
        self.indicators.insert(alias.to_string(), Box::new(indicator));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Indicator, IndicatorError> {
        self.indicators
            .get(name)
            .map(|b| &**b)
            .ok_or_else(|| IndicatorError::UnknownIndicator {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indicators.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.indicators.keys().map(String::as_str).collect()
    }

    pub fn default_window(&self) -> usize {
        self.default_window
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::standard(DEFAULT_WINDOW)
    }
}

impl fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("default_window", &self.default_window)
            .field("indicators", &self.names())
            .finish()
    }
}

/// Looks indicators up by name and memoizes their columns in each symbol's table.
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    registry: IndicatorRegistry,
}

impl IndicatorEngine {
    pub fn new(registry: IndicatorRegistry) -> Self {
        Self { registry }
    }

    pub fn standard(default_window: usize) -> Self {
        Self::new(IndicatorRegistry::standard(default_window))
    }

    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    pub fn lookback(&self, name: &str, args: &[Arg]) -> Result<usize, IndicatorError> {
        self.registry.get(name)?.lookback(args)
    }

    /// Memoized full column of a point indicator.
    pub fn series(
        &self,
        name: &str,
        args: &[Arg],
        data: &StockData,
    ) -> Result<Column, IndicatorError> {
        let indicator = self.registry.get(name)?;
        data.indicators()
            .get_or_compute(&self.column_key(name, args), || {
                indicator.compute(data.series(), args)
            })
    }

    /// Value of a point indicator at `t`.
    pub fn value(
        &self,
        name: &str,
        args: &[Arg],
        data: &StockData,
        t: usize,
    ) -> Result<f64, IndicatorError> {
        let lookback = self.lookback(name, args)?;
        check_time(&series_key(name, args), t, lookback, data.len())?;
        Ok(self.series(name, args, data)?[t])
    }

    /// Look-back of `IndQuantile(name, q [, window])`: base look-back plus window - 1.
    pub fn quantile_lookback(
        &self,
        name: &str,
        q: f64,
        args: &[Arg],
    ) -> Result<usize, IndicatorError> {
        quantile::check_quantile(q)?;
        let window = window_arg("IndQuantile", args, self.registry.default_window(), 1)?;
        self.lookback(name, &[])?
            .checked_add(window - 1)
            .ok_or_else(|| IndicatorError::InvalidArgument {
                name: "IndQuantile".to_string(),
                reason: format!("window {} is too large", window),
            })
    }

    /// Memoized rolling quantile column of a base indicator.
    pub fn quantile_series(
        &self,
        name: &str,
        q: f64,
        args: &[Arg],
        data: &StockData,
    ) -> Result<Column, IndicatorError> {
        quantile::check_quantile(q)?;
        let window = window_arg("IndQuantile", args, self.registry.default_window(), 1)?;
        let key = quantile_key(&self.column_key(name, &[]), q, window);
        data.indicators().get_or_compute(&key, || {
            let base = self.series(name, &[], data)?;
            Ok(quantile::rolling_quantile(&base, window, q))
        })
    }

    /// Value of `IndQuantile(name, q [, window])` at `t`.
    pub fn quantile_value(
        &self,
        name: &str,
        q: f64,
        args: &[Arg],
        data: &StockData,
        t: usize,
    ) -> Result<f64, IndicatorError> {
        let lookback = self.quantile_lookback(name, q, args)?;
        let window = window_arg("IndQuantile", args, self.registry.default_window(), 1)?;
        check_time(&quantile_key(name, q, window), t, lookback, data.len())?;
        Ok(self.quantile_series(name, q, args, data)?[t])
    }

    /// Table key of a point column. Without args the column depends on the default window.
    fn column_key(&self, name: &str, args: &[Arg]) -> String {
        if args.is_empty() {
            format!("{}@{}", name, self.registry.default_window())
        } else {
            series_key(name, args)
        }
    }
}

fn quantile_key(name: &str, q: f64, window: usize) -> String {
    format!("IndQuantile({},{},{})", name, q, window)
}

fn check_time(key: &str, t: usize, lookback: usize, len: usize) -> Result<(), IndicatorError> {
    if t < lookback {
        return Err(IndicatorError::InsufficientHistory {
            name: key.to_string(),
            time: t,
            lookback,
        });
    }
    if t >= len {
        return Err(IndicatorError::InvalidArgument {
            name: key.to_string(),
            reason: format!("time {} is past the end of the series ({} rows)", t, len),
        });
    }
    Ok(())
}
