//! Proportional weight normalization.
//!
//! Turns raw per-asset scores (predicted returns, signal strengths) into
//! weight rows: divide by the row sum, clamp up to a floor, renormalize.
//!
//! The floor is a soft lower bound. Renormalizing after the clamp divides
//! every weight by a sum ≥ 1, so a clamped weight can end slightly below
//! `min_weight`. Rows always sum to 1 and are never negative.

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameBuilder};

/// Sums with a magnitude below this are treated as zero.
const SUM_EPSILON: f64 = 1e-12;

/// Check that a floor of `min_weight` is satisfiable across `n_assets`.
pub fn check_floor(min_weight: f64, n_assets: usize) -> Result<()> {
    if !min_weight.is_finite() || min_weight < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "min_weight must be a finite value >= 0, got {min_weight}"
        )));
    }
    if min_weight * n_assets as f64 > 1.0 + SUM_EPSILON {
        return Err(Error::InfeasibleFloor {
            min_weight,
            assets: n_assets,
        });
    }
    Ok(())
}

/// Normalize one row of scores into weights.
///
/// # Example
///
/// ```
/// use nanofolio::normalize::normalize_row;
///
/// let w = normalize_row(&[0.9, 0.05, 0.05], 0.2).unwrap();
/// assert!((w[0] - 0.9 / 1.3).abs() < 1e-12);
/// assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// ```
pub fn normalize_row(scores: &[f64], min_weight: f64) -> Result<Vec<f64>> {
    if scores.is_empty() {
        return Err(Error::InvalidConfig("no assets to weight".into()));
    }
    check_floor(min_weight, scores.len())?;

    if scores.iter().any(|s| !s.is_finite()) {
        return Err(Error::NonFinite("scores"));
    }

    let sum: f64 = scores.iter().sum();
    if !sum.is_finite() || sum.abs() < SUM_EPSILON {
        return Err(Error::ZeroScoreSum { sum });
    }

    // Proportional weights sum to 1 here, so at least one is positive and the
    // clamped total below is >= 1.
    let clamped: Vec<f64> = scores.iter().map(|s| (s / sum).max(min_weight)).collect();
    let total: f64 = clamped.iter().sum();

    Ok(clamped.into_iter().map(|w| w / total).collect())
}

/// Normalize every row of a score table.
///
/// The output has the same dates and columns as `scores`.
pub fn proportional_weights(scores: &Frame, min_weight: f64) -> Result<Frame> {
    check_floor(min_weight, scores.columns().len())?;

    let mut builder = FrameBuilder::with_capacity(scores.columns().to_vec(), scores.len())?;
    for (date, row) in scores.iter() {
        builder.push(date, normalize_row(row, min_weight)?)?;
    }
    Ok(builder.finish())
}
