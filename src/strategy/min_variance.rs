//! Minimum-variance allocation.

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::normalize::check_floor;
use crate::optimize::{ProjectedGradient, QuadraticSolver, min_variance_weights};

use super::Strategy;

/// Minimum-variance portfolio over the investable columns of each window.
///
/// Emits a single row dated at the window's last date. The executor calls it
/// once per evaluation date, so that is also the rebalancing frequency.
#[derive(Clone, Debug)]
pub struct MinimumVariance<Q = ProjectedGradient> {
    min_weight: f64,
    features: Vec<String>,
    solver: Q,
}

impl MinimumVariance<ProjectedGradient> {
    /// Default floor applied per asset.
    pub const DEFAULT_MIN_WEIGHT: f64 = 0.05;

    /// A strategy with the given per-asset floor and the default solver.
    ///
    /// Rejects a negative or non-finite floor. Whether the floor is feasible
    /// depends on the number of assets and is checked on each call.
    pub fn new(min_weight: f64) -> Result<Self> {
        check_floor(min_weight, 0)?;
        Ok(Self {
            min_weight,
            features: Vec::new(),
            solver: ProjectedGradient::default(),
        })
    }
}

impl<Q: QuadraticSolver> MinimumVariance<Q> {
    /// Columns to leave out of the covariance (benchmark or feature series).
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Swap in another solver.
    pub fn with_solver<R: QuadraticSolver>(self, solver: R) -> MinimumVariance<R> {
        MinimumVariance {
            min_weight: self.min_weight,
            features: self.features,
            solver,
        }
    }

    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

impl<Q: QuadraticSolver> Strategy for MinimumVariance<Q> {
    fn name(&self) -> &str {
        "Minimum Variance Portfolio"
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        let assets = history.drop_columns(&self.features)?;
        let last = assets.last_date().ok_or(Error::EmptyRange)?;
        let weights = min_variance_weights(assets.rows(), self.min_weight, &self.solver)?;
        Frame::new(vec![last], assets.columns().to_vec(), vec![weights])
    }
}
