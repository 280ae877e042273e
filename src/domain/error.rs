//! Domain error types.
//!
//! Data and config errors abort a single run. Broker rejections are a separate,
//! recoverable type (see [`crate::domain::order::OrderRejection`]).

use chrono::NaiveDate;

/// Problems with the bar sequence handed to a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("price series for {symbol} is empty")]
    Empty { symbol: String },

    #[error("bar {index} dated {date} is not after previous bar {previous}")]
    OutOfOrder {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: String },

    #[error("failed to fetch {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error("parse error: {reason}")]
    Parse { reason: String },
}

/// Invalid or missing configuration; always raised before a run starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error in {file}: {reason}")]
    Parse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    Missing { section: String, key: String },

    #[error("invalid config value {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for macross.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::Config(_) => 2,
            BacktestError::Data(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
