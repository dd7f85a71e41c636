//! Error types for the backtest pipeline.

use chrono::NaiveDate;

/// Broad category of an [`Error`].
///
/// Shape and alignment errors point at wiring problems (the caller passed
/// tables that do not fit together). Numerical errors point at the data or the
/// window. Strategy errors come from a strategy failing to produce a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Shape,
    Numerical,
    Strategy,
    Alignment,
    Config,
}

/// Errors returned by the executor, simulator, normalizer, optimizer and reporter.
///
/// Nothing in this crate retries: every variant is fatal for the run that
/// produced it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    // === Shape ===
    #[error("row {row} has {found} values, expected {expected}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("columns do not match: expected {expected:?}, found {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("index is not strictly increasing at {date}")]
    UnorderedIndex { date: NaiveDate },

    // === Numerical ===
    #[error("scores sum to {sum}; cannot normalize")]
    ZeroScoreSum { sum: f64 },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("covariance matrix is singular ({observations} observations, {assets} assets)")]
    SingularCovariance { observations: usize, assets: usize },

    #[error("solver did not converge after {iterations} iterations")]
    SolverDidNotConverge { iterations: usize },

    // === Strategy ===
    #[error("insufficient history at {date}: need {required} rows, have {available}")]
    InsufficientHistory {
        date: NaiveDate,
        required: usize,
        available: usize,
    },

    #[error("strategy '{strategy}' produced no weights for {date}")]
    MissingStrategyRow { strategy: String, date: NaiveDate },

    #[error("invalid weight row on {date}: {reason}")]
    InvalidWeights { date: NaiveDate, reason: String },

    #[error("model error: {0}")]
    Model(String),

    // === Alignment ===
    #[error("no weight row for {date}")]
    Alignment { date: NaiveDate },

    #[error("missing return for {asset} on {date}")]
    MissingReturn { date: NaiveDate, asset: String },

    // === Config ===
    #[error("min_weight {min_weight} is infeasible for {assets} assets")]
    InfeasibleFloor { min_weight: f64, assets: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no dates in range")]
    EmptyRange,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. }
            | Error::ColumnMismatch { .. }
            | Error::UnknownColumn(_)
            | Error::DuplicateColumn(_)
            | Error::UnorderedIndex { .. } => ErrorKind::Shape,
            Error::ZeroScoreSum { .. }
            | Error::NonFinite(_)
            | Error::SingularCovariance { .. }
            | Error::SolverDidNotConverge { .. } => ErrorKind::Numerical,
            Error::InsufficientHistory { .. }
            | Error::MissingStrategyRow { .. }
            | Error::InvalidWeights { .. }
            | Error::Model(_) => ErrorKind::Strategy,
            Error::Alignment { .. } | Error::MissingReturn { .. } => ErrorKind::Alignment,
            Error::InfeasibleFloor { .. } | Error::InvalidConfig(_) | Error::EmptyRange => {
                ErrorKind::Config
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            Error::Alignment { date }.to_string(),
            "no weight row for 2024-03-01"
        );
        assert_eq!(
            Error::MissingReturn {
                date,
                asset: "AAPL".into()
            }
            .to_string(),
            "missing return for AAPL on 2024-03-01"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::EmptyRange.kind(), ErrorKind::Config);
        assert_eq!(
            Error::SingularCovariance {
                observations: 2,
                assets: 3
            }
            .kind(),
            ErrorKind::Numerical
        );
        assert_eq!(Error::Model("x".into()).kind(), ErrorKind::Strategy);
        assert_eq!(Error::UnknownColumn("x".into()).kind(), ErrorKind::Shape);
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::ZeroScoreSum { sum: 0.0 });
        assert!(err.to_string().contains("cannot normalize"));
    }
}
