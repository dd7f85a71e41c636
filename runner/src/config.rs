//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nanofolio::{ReportConfig, Window};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Strategy input: asset returns plus any feature columns
    pub dataset: PathBuf,
    /// Returns replayed by the simulator; defaults to `dataset`
    #[serde(default)]
    pub market_data: Option<PathBuf>,
    /// Columns that feed the strategy but never receive weight
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    /// Trailing window length in rows; omit for an expanding window
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MinimumVariance,
    FactorModel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Per-asset weight floor; each strategy has its own default
    #[serde(default)]
    pub min_weight: Option<f64>,
    /// Last date of the factor model's training period
    #[serde(default)]
    pub train_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_initial_value")]
    pub initial_value: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            initial_value: default_initial_value(),
            risk_free_rate: default_risk_free_rate(),
            periods_per_year: default_periods_per_year(),
        }
    }
}

fn default_initial_value() -> f64 {
    100.0
}
fn default_risk_free_rate() -> f64 {
    5.0
}
fn default_periods_per_year() -> f64 {
    250.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    "./results".into()
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// Relative data and output paths are resolved against the config
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.data.dataset.as_os_str().is_empty() {
            return Err(Error::Config("dataset path must not be empty".into()));
        }
        if self.backtest.window_size == Some(0) {
            return Err(Error::Config("window_size must be > 0".into()));
        }
        if let Some(w) = self.strategy.min_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Config("min_weight must be >= 0".into()));
            }
        }
        match (self.strategy.kind, self.strategy.train_end) {
            (StrategyKind::FactorModel, None) => {
                return Err(Error::Config(
                    "factor_model strategy requires train_end".into(),
                ));
            }
            (StrategyKind::FactorModel, Some(end)) if end >= self.backtest.start_date => {
                return Err(Error::Config(
                    "train_end must be before start_date".into(),
                ));
            }
            (StrategyKind::FactorModel, Some(_)) if self.data.features.len() != 1 => {
                return Err(Error::Config(
                    "factor_model strategy needs exactly one feature column".into(),
                ));
            }
            _ => {}
        }
        if !self.report.initial_value.is_finite() || self.report.initial_value <= 0.0 {
            return Err(Error::Config("initial_value must be > 0".into()));
        }
        if !self.report.periods_per_year.is_finite() || self.report.periods_per_year <= 0.0 {
            return Err(Error::Config("periods_per_year must be > 0".into()));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.data.dataset = resolve(&self.data.dataset);
        self.data.market_data = self.data.market_data.as_deref().map(&resolve);
        self.output.dir = resolve(&self.output.dir);
    }

    /// Path of the returns replayed by the simulator.
    pub fn market_data_path(&self) -> &Path {
        self.data.market_data.as_deref().unwrap_or(&self.data.dataset)
    }

    pub fn window(&self) -> Window {
        match self.backtest.window_size {
            Some(n) => Window::Sliding(n),
            None => Window::Expanding,
        }
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            initial_value: self.report.initial_value,
            risk_free_rate: self.report.risk_free_rate,
            periods_per_year: self.report.periods_per_year,
        }
    }
}
