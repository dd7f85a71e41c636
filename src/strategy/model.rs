//! Return models consumed by [`ProportionalStrategy`](super::ProportionalStrategy).

use crate::error::{Error, Result};
use crate::frame::Frame;

/// A fitted model predicting one return per asset from a row of features.
pub trait ReturnModel {
    fn name(&self) -> &str;

    /// Feature columns read from each history row, in the order `predict` expects.
    fn features(&self) -> &[String];

    /// Assets predicted, in output order.
    fn assets(&self) -> &[String];

    /// Predicted returns for one date, one per asset.
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Intercept and slope of one asset's regression on the feature.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coefficients {
    pub alpha: f64,
    pub beta: f64,
}

/// Single-factor linear model: `r_asset = alpha + beta · r_feature`.
///
/// One ordinary-least-squares fit per asset against a shared feature column,
/// typically a market index return.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorModel {
    features: Vec<String>,
    assets: Vec<String>,
    coefficients: Vec<Coefficients>,
}

impl FactorModel {
    /// Fit on every non-feature column of `training`.
    pub fn fit(training: &Frame, feature: &str) -> Result<Self> {
        let assets: Vec<String> = training
            .columns()
            .iter()
            .filter(|c| c.as_str() != feature)
            .cloned()
            .collect();
        Self::fit_assets(training, feature, &assets)
    }

    /// Fit on the named asset columns only.
    pub fn fit_assets(training: &Frame, feature: &str, assets: &[String]) -> Result<Self> {
        if assets.is_empty() {
            return Err(Error::Model("no assets to fit".into()));
        }
        if training.len() < 2 {
            return Err(Error::Model(format!(
                "need at least 2 training rows, got {}",
                training.len()
            )));
        }

        let x = training.column(feature)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite("training features"));
        }

        let n = x.len() as f64;
        let mean_x = x.iter().sum::<f64>() / n;
        let var_x: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
        if var_x <= 0.0 {
            return Err(Error::Model(format!("feature '{feature}' has zero variance")));
        }

        let mut coefficients = Vec::with_capacity(assets.len());
        for asset in assets {
            let y = training.column(asset)?;
            if y.iter().any(|v| !v.is_finite()) {
                return Err(Error::NonFinite("training targets"));
            }
            let mean_y = y.iter().sum::<f64>() / n;
            let cov_xy: f64 = x
                .iter()
                .zip(&y)
                .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
                .sum();
            let beta = cov_xy / var_x;
            coefficients.push(Coefficients {
                alpha: mean_y - beta * mean_x,
                beta,
            });
        }

        Ok(Self {
            features: vec![feature.to_string()],
            assets: assets.to_vec(),
            coefficients,
        })
    }

    /// Build from known coefficients, one per asset.
    pub fn from_coefficients(
        feature: &str,
        assets: Vec<String>,
        coefficients: Vec<Coefficients>,
    ) -> Result<Self> {
        if assets.len() != coefficients.len() {
            return Err(Error::ShapeMismatch {
                row: 0,
                expected: assets.len(),
                found: coefficients.len(),
            });
        }
        Ok(Self {
            features: vec![feature.to_string()],
            assets,
            coefficients,
        })
    }

    pub fn coefficients(&self) -> &[Coefficients] {
        &self.coefficients
    }
}

impl ReturnModel for FactorModel {
    fn name(&self) -> &str {
        "Factor Regression"
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn assets(&self) -> &[String] {
        &self.assets
    }

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        let [x] = features else {
            return Err(Error::ShapeMismatch {
                row: 0,
                expected: 1,
                found: features.len(),
            });
        };
        if !x.is_finite() {
            return Err(Error::NonFinite("features"));
        }
        Ok(self
            .coefficients
            .iter()
            .map(|c| c.alpha + c.beta * x)
            .collect())
    }
}
