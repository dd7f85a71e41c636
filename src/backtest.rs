//! End-to-end backtests: executor, simulator and report in one call.

use chrono::NaiveDate;

use crate::error::Result;
use crate::executor::{self, Window};
use crate::frame::Frame;
use crate::report::{Report, ReportConfig};
use crate::strategy::Strategy;

/// One backtest: a strategy, the history it sees, and the returns it is
/// replayed against.
///
/// `history` and `returns` are often the same frame. When they differ,
/// `returns` must cover every evaluated date.
#[derive(Clone, Copy)]
pub struct Backtest<'a> {
    pub strategy: &'a (dyn Strategy + Sync),
    pub history: &'a Frame,
    pub returns: &'a Frame,
    pub start_date: NaiveDate,
    pub window: Window,
}

impl<'a> Backtest<'a> {
    /// Backtest on a single frame used both as strategy input and for replay.
    pub fn new(strategy: &'a (dyn Strategy + Sync), data: &'a Frame, start_date: NaiveDate) -> Self {
        Self {
            strategy,
            history: data,
            returns: data,
            start_date,
            window: Window::Expanding,
        }
    }

    pub fn with_returns(mut self, returns: &'a Frame) -> Self {
        self.returns = returns;
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Build the weight schedule, replay it over the returns from the start
    /// date onwards, and report.
    pub fn run(&self, config: ReportConfig) -> Result<Report> {
        let weights = executor::run(self.strategy, self.history, self.start_date, self.window)?;
        let returns = self.returns.starting_at(self.start_date);
        Report::analyze(self.strategy.name(), weights, &returns, config)
    }

    /// Same as [`run`](Self::run), with the per-date strategy calls spread
    /// over the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self, config: ReportConfig) -> Result<Report> {
        let weights =
            executor::run_parallel(self.strategy, self.history, self.start_date, self.window)?;
        let returns = self.returns.starting_at(self.start_date);
        Report::analyze(self.strategy.name(), weights, &returns, config)
    }
}

impl std::fmt::Debug for Backtest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtest")
            .field("strategy", &self.strategy.name())
            .field("start_date", &self.start_date)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

/// Run independent backtests in parallel.
///
/// Returns one result per backtest, in input order. A failing backtest does
/// not affect the others.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use nanofolio::backtest::{compare, Backtest};
/// use nanofolio::strategy::MinimumVariance;
/// use nanofolio::{Frame, ReportConfig};
///
/// let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let index: Vec<_> = (0..30).map(|i| d0 + chrono::Days::new(i)).collect();
/// let rows: Vec<Vec<f64>> = (0..30)
///     .map(|i| {
///         let x = i as f64;
///         vec![(x * 0.7).sin() * 0.01, (x * 1.3).cos() * 0.02]
///     })
///     .collect();
/// let data = Frame::new(index, vec!["A".into(), "B".into()], rows)?;
///
/// let loose = MinimumVariance::new(0.0)?;
/// let tight = MinimumVariance::new(0.4)?;
/// let start = d0 + chrono::Days::new(10);
/// let reports = compare(
///     &[Backtest::new(&loose, &data, start), Backtest::new(&tight, &data, start)],
///     ReportConfig::default(),
/// );
/// assert_eq!(reports.len(), 2);
/// assert!(reports.iter().all(|r| r.is_ok()));
/// # Ok::<(), nanofolio::Error>(())
/// ```
#[cfg(feature = "parallel")]
pub fn compare(backtests: &[Backtest<'_>], config: ReportConfig) -> Vec<Result<Report>> {
    use rayon::prelude::*;

    backtests.par_iter().map(|b| b.run(config)).collect()
}
