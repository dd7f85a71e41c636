//! Error types for the backtest runner.

use std::path::PathBuf;

/// All errors that can occur while running a configured backtest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read data file {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("bad data in {path}: {reason}")]
    Data { path: PathBuf, reason: String },

    #[error("backtest failed: {0}")]
    Backtest(#[from] nanofolio::Error),

    #[error("failed to serialize metrics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code: 2 when the backtest itself failed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Backtest(e) if e.kind() != nanofolio::ErrorKind::Config => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
