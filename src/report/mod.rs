//! Backtest reports: value series, returns and metrics of a completed simulation.
//!
//! A [`Report`] is built once from a weight schedule and the value breakdown
//! the simulator produced for it. Everything in it is derived on
//! construction and read-only afterwards.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use nanofolio::Frame;
//! use nanofolio::report::{Report, ReportConfig};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
//! let assets = vec!["A".to_string(), "B".to_string()];
//! let weights = Frame::new(vec![d(2), d(3), d(4)], assets.clone(), vec![vec![0.5, 0.5]; 3])?;
//! let returns = Frame::new(
//!     vec![d(2), d(3), d(4)],
//!     assets,
//!     vec![vec![0.01, 0.03], vec![-0.02, 0.00], vec![0.01, 0.02]],
//! )?;
//!
//! let report = Report::analyze("50/50", weights, &returns, ReportConfig::default())?;
//! assert_eq!(report.portfolio_values().len(), 3);
//! assert_eq!(report.portfolio_returns().len(), 2);
//! println!("{}", report.metrics());
//! # Ok::<(), nanofolio::Error>(())
//! ```

pub mod metrics;

pub use metrics::{Metrics, compute_metrics, pct_change};

use crate::error::Result;
use crate::frame::{Frame, Series, row_total};
use crate::simulate::{DEFAULT_INITIAL_VALUE, simulate};

/// Parameters of the analytics.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportConfig {
    /// Starting portfolio value
    pub initial_value: f64,
    /// Reference return subtracted from the total return in the Sharpe
    /// ratio, on the same scale as the portfolio value
    pub risk_free_rate: f64,
    /// Annualization factor for volatility
    pub periods_per_year: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            initial_value: DEFAULT_INITIAL_VALUE,
            risk_free_rate: 5.0,
            periods_per_year: 250.0,
        }
    }
}

/// The outcome of one backtest.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Report {
    strategy_name: String,
    config: ReportConfig,
    weights: Frame,
    breakdown: Frame,
    values: Series,
    returns: Series,
    metrics: Metrics,
}

impl Report {
    /// Build a report from a weight schedule and its simulated value breakdown.
    pub fn new(
        strategy_name: impl Into<String>,
        weights: Frame,
        breakdown: Frame,
        config: ReportConfig,
    ) -> Result<Self> {
        let values = Series {
            name: "Value".into(),
            index: breakdown.index().to_vec(),
            values: breakdown.rows().iter().map(|row| row_total(row)).collect(),
        };

        let metrics = compute_metrics(&values.values, &config)?;

        let returns = Series {
            name: "Return".into(),
            index: values.index.iter().skip(1).copied().collect(),
            values: pct_change(&values.values)?,
        };

        Ok(Self {
            strategy_name: strategy_name.into(),
            config,
            weights,
            breakdown,
            values,
            returns,
            metrics,
        })
    }

    /// Simulate `weights` against `returns` and build the report.
    pub fn analyze(
        strategy_name: impl Into<String>,
        weights: Frame,
        returns: &Frame,
        config: ReportConfig,
    ) -> Result<Self> {
        let breakdown = simulate(&weights, returns, config.initial_value)?;
        Self::new(strategy_name, weights, breakdown, config)
    }

    // === Queries ===

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// The weight schedule that was replayed.
    pub fn weights(&self) -> &Frame {
        &self.weights
    }

    /// Per-asset values after each date's return.
    pub fn breakdown(&self) -> &Frame {
        &self.breakdown
    }

    /// Total portfolio value per date (row sums of the breakdown).
    pub fn portfolio_values(&self) -> &Series {
        &self.values
    }

    /// Period returns of the portfolio; starts at the second date.
    pub fn portfolio_returns(&self) -> &Series {
        &self.returns
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Portfolio returns in percent, rounded to two decimals.
    pub fn percentage_returns(&self) -> Series {
        Series {
            name: "Return (%)".into(),
            index: self.returns.index.clone(),
            values: self.returns.values.iter().map(|r| round2(r * 100.0)).collect(),
        }
    }

    /// Headline metrics as labelled rows, rounded to two decimals.
    /// Undefined values are `None`.
    pub fn metrics_table(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("Portfolio return", Some(round2(self.metrics.total_return))),
            (
                "Portfolio volatility",
                self.metrics.annualized_volatility.map(round2),
            ),
            ("Sharpe ratio", self.metrics.sharpe_ratio.map(round2)),
        ]
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
