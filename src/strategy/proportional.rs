//! Weights proportional to model-predicted returns.

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameBuilder};
use crate::normalize::{check_floor, proportional_weights};

use super::Strategy;
use super::model::ReturnModel;

/// Predicts each asset's return with a fitted model and allocates in
/// proportion to the predictions, with a per-asset floor.
///
/// Emits a single row dated at the slice's last date. Earlier rows of the
/// slice are never predicted, so a gap in a past feature value does not
/// affect later dates.
#[derive(Clone, Debug)]
pub struct ProportionalStrategy<M> {
    model: M,
    min_weight: f64,
}

impl<M: ReturnModel> ProportionalStrategy<M> {
    /// Default floor applied per asset.
    pub const DEFAULT_MIN_WEIGHT: f64 = 0.2;

    /// Wrap a fitted model. Fails if the floor is infeasible for the model's assets.
    pub fn new(model: M, min_weight: f64) -> Result<Self> {
        check_floor(min_weight, model.assets().len())?;
        Ok(Self { model, min_weight })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    /// Raw predictions for every row of `history`, before normalization.
    pub fn predictions(&self, history: &Frame) -> Result<Frame> {
        let features = history.select(self.model.features())?;
        let mut builder = FrameBuilder::with_capacity(self.model.assets().to_vec(), history.len())?;
        for (date, row) in features.iter() {
            builder.push(date, self.model.predict(row)?)?;
        }
        Ok(builder.finish())
    }
}

impl<M: ReturnModel> Strategy for ProportionalStrategy<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        if history.is_empty() {
            return Err(Error::EmptyRange);
        }
        let latest = history.slice(history.len() - 1..history.len());
        let predicted = self.predictions(&latest)?;
        proportional_weights(&predicted, self.min_weight)
    }
}
