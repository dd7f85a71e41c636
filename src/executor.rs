//! Rolling-window strategy execution.
//!
//! Walks the history index from a start date, hands the strategy every row up
//! to and including each evaluation date (or a fixed-width trailing window),
//! and keeps only the row the strategy produced for that date. The slice never
//! contains a row after the evaluation date, so the schedule is free of
//! look-ahead by construction.
//!
//! Every kept row must be a valid weight row (finite, non-negative, summing
//! to one). A run is all-or-nothing: the first failing date fails the run and
//! no partial schedule is returned.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameBuilder};
use crate::strategy::Strategy;

/// How much history the strategy sees at each date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Window {
    /// Every row from the start of the history through the evaluation date.
    #[default]
    Expanding,
    /// Exactly the last `n` rows ending at the evaluation date.
    Sliding(usize),
}

impl Window {
    fn validate(self) -> Result<()> {
        match self {
            Window::Sliding(0) => Err(Error::InvalidConfig("window size must be > 0".into())),
            _ => Ok(()),
        }
    }

    /// Positional range of the slice ending at `pos` (inclusive).
    fn range(self, history: &Frame, pos: usize) -> Result<std::ops::Range<usize>> {
        match self {
            Window::Expanding => Ok(0..pos + 1),
            Window::Sliding(n) => {
                if pos + 1 < n {
                    return Err(Error::InsufficientHistory {
                        date: history.index()[pos],
                        required: n,
                        available: pos + 1,
                    });
                }
                Ok(pos + 1 - n..pos + 1)
            }
        }
    }
}

/// Run `strategy` over every date in `history` at or after `start_date`.
///
/// Returns the weight schedule: one row per evaluated date, columns as
/// produced by the strategy.
///
/// # Errors
///
/// - `EmptyRange` when no date is at or after `start_date`.
/// - `InvalidConfig` for `Window::Sliding(0)`.
/// - `InsufficientHistory` when a sliding window does not fit.
/// - `MissingStrategyRow` when the strategy returns no row for the date.
/// - `InvalidWeights` when that row is negative, non-finite or does not sum to one.
/// - `ColumnMismatch` when the strategy changes its columns mid-run.
/// - Any error the strategy itself returns.
pub fn run<S: Strategy + ?Sized>(
    strategy: &S,
    history: &Frame,
    start_date: NaiveDate,
    window: Window,
) -> Result<Frame> {
    window.validate()?;
    let first = first_position(history, start_date)?;

    let mut schedule: Option<FrameBuilder> = None;
    for pos in first..history.len() {
        let (columns, row) = weights_for(strategy, history, pos, window)?;
        append(&mut schedule, history.index()[pos], columns, row, history.len() - first)?;
    }

    finish(schedule)
}

/// Same as [`run`], evaluating dates in parallel.
///
/// Only valid for strategies whose `execute` depends on nothing but its input
/// slice, which the [`Strategy`] contract already requires. The schedule is
/// reassembled in date order and is identical to the sequential one.
#[cfg(feature = "parallel")]
pub fn run_parallel<S: Strategy + Sync + ?Sized>(
    strategy: &S,
    history: &Frame,
    start_date: NaiveDate,
    window: Window,
) -> Result<Frame> {
    use rayon::prelude::*;

    window.validate()?;
    let first = first_position(history, start_date)?;

    let rows: Vec<(Vec<String>, Vec<f64>)> = (first..history.len())
        .into_par_iter()
        .map(|pos| weights_for(strategy, history, pos, window))
        .collect::<Result<_>>()?;

    let mut schedule: Option<FrameBuilder> = None;
    for (pos, (columns, row)) in (first..history.len()).zip(rows) {
        append(&mut schedule, history.index()[pos], columns, row, history.len() - first)?;
    }

    finish(schedule)
}

fn first_position(history: &Frame, start_date: NaiveDate) -> Result<usize> {
    let first = history.index().partition_point(|d| *d < start_date);
    if first == history.len() {
        return Err(Error::EmptyRange);
    }
    Ok(first)
}

/// Execute the strategy on the slice ending at `pos` and keep its row for that date.
fn weights_for<S: Strategy + ?Sized>(
    strategy: &S,
    history: &Frame,
    pos: usize,
    window: Window,
) -> Result<(Vec<String>, Vec<f64>)> {
    let date = history.index()[pos];
    let slice = history.slice(window.range(history, pos)?);

    let output = strategy.execute(&slice)?;
    let row = output.row_at(date).ok_or_else(|| Error::MissingStrategyRow {
        strategy: strategy.name().to_string(),
        date,
    })?;
    check_weight_row(date, row)?;

    Ok((output.columns().to_vec(), row.to_vec()))
}

/// Tolerance on a row sum, per asset.
const SUM_TOLERANCE: f64 = 1e-9;

fn check_weight_row(date: NaiveDate, row: &[f64]) -> Result<()> {
    let invalid = |reason: String| -> Result<()> { Err(Error::InvalidWeights { date, reason }) };

    if let Some(w) = row.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return invalid(format!("weight {w} is negative or non-finite"));
    }
    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE * row.len().max(1) as f64 {
        return invalid(format!("weights sum to {sum}"));
    }
    Ok(())
}

fn append(
    schedule: &mut Option<FrameBuilder>,
    date: NaiveDate,
    columns: Vec<String>,
    row: Vec<f64>,
    capacity: usize,
) -> Result<()> {
    let mut builder = match schedule.take() {
        Some(builder) if builder.columns() != columns.as_slice() => {
            return Err(Error::ColumnMismatch {
                expected: builder.columns().to_vec(),
                found: columns,
            });
        }
        Some(builder) => builder,
        None => FrameBuilder::with_capacity(columns, capacity)?,
    };
    builder.push(date, row)?;
    *schedule = Some(builder);
    Ok(())
}

fn finish(schedule: Option<FrameBuilder>) -> Result<Frame> {
    schedule.map(FrameBuilder::finish).ok_or(Error::EmptyRange)
}
