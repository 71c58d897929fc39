//! Domain error types.

/// A syntax error in a strategy program, with the character offset it was found at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("syntax error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    ///
    /// `position` is a byte offset; the caret is padded by characters.
    pub fn display_with_context(&self, input: &str) -> String {
        let column = input
            .get(..self.position)
            .map_or(self.position, |prefix| prefix.chars().count());
        let caret = " ".repeat(column) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failures raised by the indicator engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("unknown indicator '{name}'")]
    UnknownIndicator { name: String },

    #[error("invalid quantile {value}: must be within [0, 1]")]
    InvalidQuantile { value: f64 },

    #[error("insufficient history for {name} at time {time}: look-back is {lookback}")]
    InsufficientHistory {
        name: String,
        time: usize,
        lookback: usize,
    },

    #[error("invalid argument for {name}: {reason}")]
    InvalidArgument { name: String, reason: String },
}

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum BacktesterError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("symbol {symbol} is not in the dataset")]
    InvalidSymbol { symbol: String },

    #[error("invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no symbols could be loaded")]
    NoSymbols,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BacktesterError> for std::process::ExitCode {
    fn from(err: &BacktesterError) -> Self {
        let code: u8 = match err {
            BacktesterError::Io(_) => 1,
            BacktesterError::ConfigParse { .. }
            | BacktesterError::ConfigMissing { .. }
            | BacktesterError::ConfigInvalid { .. } => 2,
            BacktesterError::Data { .. }
            | BacktesterError::InvalidSeries { .. }
            | BacktesterError::NoSymbols => 3,
            BacktesterError::Syntax(_) | BacktesterError::Indicator(_) => 4,
            BacktesterError::InvalidSymbol { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
