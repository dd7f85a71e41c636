//! Long-only minimum-variance optimization with a per-asset floor.
//!
//! Solves `min wᵀΣw` subject to `Σw = 1` and `w ≥ floor`, where Σ is the
//! sample covariance of a return window. The problem is convex; it has a
//! unique minimum when Σ is positive definite, which is checked up front with
//! a Cholesky factorization. A rank-deficient Σ is reported as
//! [`Error::SingularCovariance`] rather than solved.
//!
//! The solver itself sits behind [`QuadraticSolver`]. [`ProjectedGradient`]
//! is the built-in implementation.

use crate::error::{Error, Result};
use crate::normalize::check_floor;

/// A solver for `min wᵀQw` over `{w : Σw = 1, w ≥ floor}`.
///
/// Implementations return an error when they cannot reach the optimum; they
/// must never fall back to some other allocation.
pub trait QuadraticSolver {
    fn minimize(&self, q: &[Vec<f64>], floor: f64) -> Result<Vec<f64>>;
}

/// Projected gradient descent on the floored simplex.
///
/// Substitutes `w = floor + s·v` with `s = 1 − n·floor` and `v` on the unit
/// simplex, takes gradient steps of size `1/L` (L a Gershgorin bound on the
/// Hessian) and projects back onto the simplex after every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedGradient {
    /// Iteration budget before giving up with `SolverDidNotConverge`.
    pub max_iterations: usize,
    /// Converged when the squared length of a step falls below this.
    pub tolerance: f64,
}

impl Default for ProjectedGradient {
    fn default() -> Self {
        Self {
            max_iterations: 200_000,
            tolerance: 1e-20,
        }
    }
}

impl QuadraticSolver for ProjectedGradient {
    fn minimize(&self, q: &[Vec<f64>], floor: f64) -> Result<Vec<f64>> {
        let n = q.len();
        if n == 0 {
            return Err(Error::InvalidConfig("empty covariance matrix".into()));
        }
        check_floor(floor, n)?;

        let scale = 1.0 - n as f64 * floor;
        if scale <= 1e-15 {
            // floor * n == 1: the floor is the only feasible point.
            return Ok(vec![1.0 / n as f64; n]);
        }

        let lipschitz = 2.0 * scale * scale * gershgorin_bound(q);
        if !lipschitz.is_finite() || lipschitz <= 0.0 {
            return Err(Error::NonFinite("covariance matrix"));
        }
        let step = 1.0 / lipschitz;

        let mut v = equal_weights(n);
        for _ in 0..self.max_iterations {
            let w = lift(&v, floor, scale);
            let grad: Vec<f64> = mat_vec_mul(q, &w).iter().map(|g| 2.0 * scale * g).collect();
            let candidate: Vec<f64> = v.iter().zip(&grad).map(|(vi, gi)| vi - step * gi).collect();
            if candidate.iter().any(|x| !x.is_finite()) {
                return Err(Error::NonFinite("solver iterate"));
            }
            let projected = project_simplex(&candidate);

            if squared_distance(&projected, &v) < self.tolerance {
                return Ok(lift(&projected, floor, scale));
            }
            v = projected;
        }

        Err(Error::SolverDidNotConverge {
            iterations: self.max_iterations,
        })
    }
}

/// Minimum-variance weights for a window of returns (rows = dates, columns = assets).
///
/// # Errors
///
/// - `ShapeMismatch` for ragged input, `NonFinite` for NaN/Inf returns.
/// - `SingularCovariance` when there are fewer than `assets + 1` rows or the
///   sample covariance is not positive definite.
/// - `InfeasibleFloor` / `InvalidConfig` for a bad floor.
/// - Whatever the solver reports when it fails.
pub fn min_variance_weights<Q: QuadraticSolver + ?Sized>(
    returns: &[Vec<f64>],
    floor: f64,
    solver: &Q,
) -> Result<Vec<f64>> {
    let (rows, cols) = matrix_shape(returns)?;
    check_floor(floor, cols)?;

    // A sample covariance of `rows` observations has rank at most rows - 1.
    if rows < cols + 1 {
        return Err(Error::SingularCovariance {
            observations: rows,
            assets: cols,
        });
    }

    let cov = covariance_matrix(returns);
    if !is_positive_definite(&cov) {
        return Err(Error::SingularCovariance {
            observations: rows,
            assets: cols,
        });
    }

    if cols == 1 {
        return Ok(vec![1.0]);
    }

    solver.minimize(&cov, floor)
}

fn matrix_shape(matrix: &[Vec<f64>]) -> Result<(usize, usize)> {
    let rows = matrix.len();
    let cols = matrix.first().map(Vec::len).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Err(Error::EmptyRange);
    }

    for (i, row) in matrix.iter().enumerate() {
        if row.len() != cols {
            return Err(Error::ShapeMismatch {
                row: i,
                expected: cols,
                found: row.len(),
            });
        }
        if row.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFinite("return window"));
        }
    }

    Ok((rows, cols))
}

fn column_means(matrix: &[Vec<f64>]) -> Vec<f64> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);

    let mut sums = vec![0.0; cols];
    for row in matrix {
        for (j, v) in row.iter().enumerate() {
            sums[j] += *v;
        }
    }

    sums.into_iter().map(|s| s / rows as f64).collect()
}

/// Sample covariance (divides by n − 1). Callers validate the shape first;
/// an empty matrix yields an empty covariance.
pub(crate) fn covariance_matrix(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    let means = column_means(matrix);

    let mut cov = vec![vec![0.0; cols]; cols];

    for row in matrix {
        for i in 0..cols {
            let di = row[i] - means[i];
            for j in i..cols {
                let dj = row[j] - means[j];
                cov[i][j] += di * dj;
            }
        }
    }

    let denom = (rows as f64 - 1.0).max(1.0);
    for i in 0..cols {
        for j in i..cols {
            let v = cov[i][j] / denom;
            cov[i][j] = v;
            cov[j][i] = v;
        }
    }

    cov
}

/// Cholesky test for positive definiteness, with pivots judged relative to
/// the largest diagonal entry.
pub(crate) fn is_positive_definite(matrix: &[Vec<f64>]) -> bool {
    let n = matrix.len();
    let max_diag = (0..n).map(|i| matrix[i][i]).fold(0.0_f64, f64::max);
    if max_diag <= 0.0 || !max_diag.is_finite() {
        return false;
    }
    let eps = max_diag * 1e-12;

    let mut l = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let partial: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = matrix[i][i] - partial;
                if pivot <= eps {
                    return false;
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (matrix[i][j] - partial) / l[j][j];
            }
        }
    }
    true
}

fn gershgorin_bound(matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0_f64, f64::max)
}

fn lift(v: &[f64], floor: f64, scale: f64) -> Vec<f64> {
    v.iter().map(|vi| floor + scale * vi).collect()
}

fn mat_vec_mul(matrix: &[Vec<f64>], vec: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vec).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
}

fn equal_weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Euclidean projection onto the unit simplex.
fn project_simplex(v: &[f64]) -> Vec<f64> {
    let mut u = v.to_vec();
    u.sort_by(|a, b| b.total_cmp(a));

    let mut cssv = 0.0;
    let mut rho = 0_usize;

    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let theta = (cssv - 1.0) / (i as f64 + 1.0);
        if *ui - theta > 0.0 {
            rho = i + 1;
        }
    }

    if rho == 0 {
        return equal_weights(v.len());
    }

    let theta = (u[..rho].iter().sum::<f64>() - 1.0) / rho as f64;
    let mut projected: Vec<f64> = v.iter().map(|x| (x - theta).max(0.0)).collect();

    let sum = projected.iter().sum::<f64>();
    for x in &mut projected {
        *x /= sum;
    }
    projected
}
