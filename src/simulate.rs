//! Rebalancing simulator: replay a weight schedule against realized returns.
//!
//! Every period the whole portfolio is rebalanced to that date's weight row,
//! then each asset's allocation grows by its return. Weights never drift
//! between periods.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameBuilder, row_total};

/// Starting portfolio value.
pub const DEFAULT_INITIAL_VALUE: f64 = 100.0;

/// Replay `weights` against `returns`, starting from `initial_value`.
///
/// Walks every date of `returns` in order. For each date D: allocate the
/// current value by the weight row for D, apply `1 + return` per asset, and
/// carry the row sum forward. The returned value breakdown has the weight
/// columns and one row per return date; each row sums to the portfolio value
/// on that date.
///
/// `returns` may carry extra columns (benchmarks, features); they are
/// ignored. Weight rows dated outside the return index are ignored.
///
/// # Errors
///
/// - `InvalidConfig` for a non-positive or non-finite `initial_value`.
/// - `ColumnMismatch` if a weighted asset has no return column.
/// - `NonFinite` if any weight is NaN or infinite.
/// - `EmptyRange` if `returns` has no rows.
/// - `Alignment` naming the first return date without a weight row.
/// - `MissingReturn` for a NaN/infinite return on an asset with non-zero weight.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use nanofolio::Frame;
/// use nanofolio::simulate::simulate;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let assets = vec!["A".to_string(), "B".to_string()];
/// let weights = Frame::new(vec![d(2), d(3)], assets.clone(), vec![vec![0.5, 0.5]; 2])?;
/// let returns = Frame::new(
///     vec![d(2), d(3)],
///     assets,
///     vec![vec![0.10, -0.10], vec![0.00, 0.20]],
/// )?;
///
/// let breakdown = simulate(&weights, &returns, 100.0)?;
/// let first = breakdown.row(0).unwrap();
/// assert!((first[0] - 55.0).abs() < 1e-9 && (first[1] - 45.0).abs() < 1e-9);
/// let last: f64 = breakdown.row(1).unwrap().iter().sum();
/// assert!((last - 110.0).abs() < 1e-9);
/// # Ok::<(), nanofolio::Error>(())
/// ```
pub fn simulate(weights: &Frame, returns: &Frame, initial_value: f64) -> Result<Frame> {
    if !initial_value.is_finite() || initial_value <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "initial value must be positive, got {initial_value}"
        )));
    }

    let return_columns = asset_columns(weights, returns)?;

    if weights.rows().iter().flatten().any(|w| !w.is_finite()) {
        return Err(Error::NonFinite("weights"));
    }
    if returns.is_empty() {
        return Err(Error::EmptyRange);
    }

    let weight_rows: FxHashMap<NaiveDate, usize> = weights
        .index()
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();

    let assets = weights.columns();
    let mut breakdown = FrameBuilder::with_capacity(assets.to_vec(), returns.len())?;
    let mut current_value = initial_value;

    for (date, period_returns) in returns.iter() {
        let w = weight_rows
            .get(&date)
            .and_then(|&i| weights.row(i))
            .ok_or(Error::Alignment { date })?;

        let mut values = Vec::with_capacity(assets.len());
        for ((asset, &weight), &j) in assets.iter().zip(w).zip(&return_columns) {
            if weight == 0.0 {
                values.push(0.0);
                continue;
            }
            let r = period_returns[j];
            if !r.is_finite() {
                return Err(Error::MissingReturn {
                    date,
                    asset: asset.clone(),
                });
            }
            // Rebalance, then apply the period return
            values.push(current_value * weight * (1.0 + r));
        }

        current_value = row_total(&values);
        breakdown.push(date, values)?;
    }

    Ok(breakdown.finish())
}

/// Position in `returns` of each weight column.
fn asset_columns(weights: &Frame, returns: &Frame) -> Result<Vec<usize>> {
    let lookup: FxHashMap<&str, usize> = returns
        .columns()
        .iter()
        .enumerate()
        .map(|(j, c)| (c.as_str(), j))
        .collect();

    weights
        .columns()
        .iter()
        .map(|asset| {
            lookup
                .get(asset.as_str())
                .copied()
                .ok_or_else(|| Error::ColumnMismatch {
                    expected: weights.columns().to_vec(),
                    found: returns.columns().to_vec(),
                })
        })
        .collect()
}
