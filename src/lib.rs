//! # nanofolio
//!
//! A deterministic rolling-window portfolio backtester.
//!
//! ## Features
//!
//! - **Rolling execution**: run any [`Strategy`] over an expanding or sliding window, no look-ahead
//! - **Rebalancing replay**: full rebalance every period, per-asset value breakdown
//! - **Metrics**: total return, annualized volatility, Sharpe ratio, max drawdown
//! - **Strategies**: minimum variance with a per-asset floor, model-proportional weights
//! - **Parallel**: compare independent backtests with rayon (`parallel` feature)
//!
//! ## Quick Start
//!
//! ```
//! use chrono::{Days, NaiveDate};
//! use nanofolio::strategy::MinimumVariance;
//! use nanofolio::{Backtest, Frame, ReportConfig, Window};
//!
//! let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let index: Vec<_> = (0..40).map(|i| d0 + Days::new(i)).collect();
//! let returns: Vec<Vec<f64>> = (0..40)
//!     .map(|i| {
//!         let x = i as f64;
//!         vec![(x * 0.7).sin() * 0.01, (x * 1.3).cos() * 0.02, (x * 0.3).sin() * 0.015]
//!     })
//!     .collect();
//! let data = Frame::new(index, vec!["A".into(), "B".into(), "C".into()], returns)?;
//!
//! let strategy = MinimumVariance::new(0.05)?;
//! let report = Backtest::new(&strategy, &data, d0 + Days::new(20))
//!     .with_window(Window::Sliding(15))
//!     .run(ReportConfig::default())?;
//!
//! assert_eq!(report.weights().len(), 20);
//! for row in report.weights().rows() {
//!     assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
//!     assert!(row.iter().all(|w| *w >= 0.05 - 1e-9));
//! }
//! println!("{}", report.metrics());
//! # Ok::<(), nanofolio::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Execute | [`executor::run`] | weight schedule ([`Frame`]) |
//! | Simulate | [`simulate::simulate`] | value breakdown ([`Frame`]) |
//! | Report | [`Report::new`] | values, returns, [`Metrics`] |
//!
//! [`Backtest::run`] chains all three.
//!
//! ## Writing a strategy
//!
//! A strategy gets every row up to and including the evaluation date and must
//! return a frame containing a row for that date. See [`strategy`].

pub mod backtest;
mod error;
pub mod executor;
mod frame;
pub mod normalize;
pub mod optimize;
pub mod report;
pub mod simulate;
pub mod strategy;

// Re-export public API
pub use backtest::Backtest;
#[cfg(feature = "parallel")]
pub use backtest::compare;
pub use error::{Error, ErrorKind, Result};
pub use executor::Window;
pub use frame::{Frame, FrameBuilder, Series};
pub use report::{Metrics, Report, ReportConfig};
pub use simulate::DEFAULT_INITIAL_VALUE;
pub use strategy::Strategy;
