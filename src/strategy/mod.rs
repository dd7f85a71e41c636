//! Allocation strategies.
//!
//! A [`Strategy`] turns a slice of history into weight rows. The executor
//! hands it every row up to and including the evaluation date and keeps only
//! the row dated at that evaluation date.
//!
//! Strategies are plain values: any model they need is fitted or loaded
//! before the backtest and owned by the instance, so `execute` is a pure
//! function of `&self` and its input.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use nanofolio::{Frame, Result, Strategy};
//!
//! /// Holds every column in equal proportion.
//! struct EqualWeight;
//!
//! impl Strategy for EqualWeight {
//!     fn name(&self) -> &str {
//!         "Equal Weight"
//!     }
//!
//!     fn execute(&self, history: &Frame) -> Result<Frame> {
//!         let n = history.columns().len();
//!         let rows = vec![vec![1.0 / n as f64; n]; history.len()];
//!         Frame::new(history.index().to_vec(), history.columns().to_vec(), rows)
//!     }
//! }
//!
//! let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
//! let history = Frame::new(
//!     vec![d(2), d(3)],
//!     vec!["A".into(), "B".into()],
//!     vec![vec![0.01, 0.02], vec![0.00, -0.01]],
//! )?;
//! let weights = EqualWeight.execute(&history)?;
//! assert_eq!(weights.row_at(d(3)), Some(&[0.5, 0.5][..]));
//! # Ok::<(), nanofolio::Error>(())
//! ```

pub mod min_variance;
pub mod model;
pub mod proportional;

pub use min_variance::MinimumVariance;
pub use model::{Coefficients, FactorModel, ReturnModel};
pub use proportional::ProportionalStrategy;

use crate::error::Result;
use crate::frame::Frame;

/// An allocation strategy.
pub trait Strategy {
    /// Human-readable name, used in reports.
    fn name(&self) -> &str;

    /// Produce weight rows for a history slice.
    ///
    /// The returned frame may cover several dates but must contain a row for
    /// the slice's last date. Its columns are the assets being weighted.
    fn execute(&self, history: &Frame) -> Result<Frame>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        (**self).execute(history)
    }
}

impl<S: Strategy + ?Sized> Strategy for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        (**self).execute(history)
    }
}
