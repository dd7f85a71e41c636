//! Backtest orchestrator: load → build strategy → execute → simulate → report.
//!
//! This is the main workflow that ties together config, data and the
//! nanofolio pipeline.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};
use nanofolio::strategy::{FactorModel, MinimumVariance, ProportionalStrategy, ReturnModel};
use nanofolio::{Backtest, Frame, Report, Strategy};

use crate::config::{Config, StrategyKind};
use crate::data;
use crate::error::{Error, Result};

/// Options for a backtest run.
pub struct RunOptions {
    /// Skip writing result files
    pub no_write: bool,
}

/// Input tables of a run.
pub struct Inputs {
    pub dataset: Frame,
    /// `None` when the market data is the dataset itself
    pub market_data: Option<Frame>,
}

impl Inputs {
    pub fn load(config: &Config) -> Result<Self> {
        let dataset = data::load_frame(&config.data.dataset)?;
        let market_data = match &config.data.market_data {
            Some(path) if path != &config.data.dataset => Some(data::load_frame(path)?),
            _ => None,
        };
        Ok(Self {
            dataset,
            market_data,
        })
    }

    pub fn returns(&self) -> &Frame {
        self.market_data.as_ref().unwrap_or(&self.dataset)
    }
}

/// Shape of the loaded inputs, reported by `validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub assets: Vec<String>,
    pub features: Vec<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Dates at or after the start date
    pub evaluation_dates: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset: {} rows, {} to {}", self.rows, self.first_date, self.last_date)?;
        writeln!(f, "  Assets:   {}", self.assets.join(", "))?;
        writeln!(f, "  Features: {}", self.features.join(", "))?;
        writeln!(f, "  Evaluation dates: {}", self.evaluation_dates)
    }
}

/// Assets: dataset columns that are not features.
fn investable(config: &Config, dataset: &Frame) -> Result<Vec<String>> {
    for feature in &config.data.features {
        if dataset.column_index(feature).is_none() {
            return Err(Error::Config(format!(
                "feature column '{feature}' not in dataset"
            )));
        }
    }
    let assets: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| !config.data.features.contains(c))
        .cloned()
        .collect();
    if assets.is_empty() {
        return Err(Error::Config("dataset has no asset columns".into()));
    }
    Ok(assets)
}

/// Check config against the loaded data without running anything.
pub fn validate(config: &Config, inputs: &Inputs) -> Result<Summary> {
    let dataset = &inputs.dataset;
    let assets = investable(config, dataset)?;

    let (Some(first_date), Some(last_date)) = (dataset.first_date(), dataset.last_date()) else {
        return Err(Error::Data {
            path: config.data.dataset.clone(),
            reason: "no rows".into(),
        });
    };

    let returns = inputs.returns();
    for asset in &assets {
        if returns.column_index(asset).is_none() {
            return Err(Error::Data {
                path: config.market_data_path().to_path_buf(),
                reason: format!("no returns for asset '{asset}'"),
            });
        }
    }

    let evaluation_dates = dataset.starting_at(config.backtest.start_date).len();
    if evaluation_dates == 0 {
        return Err(Error::Config(format!(
            "start_date {} is after the last dataset date {last_date}",
            config.backtest.start_date
        )));
    }

    Ok(Summary {
        rows: dataset.len(),
        assets,
        features: config.data.features.clone(),
        first_date,
        last_date,
        evaluation_dates,
    })
}

/// Build the configured strategy. Models are fitted here, before the run.
pub fn build_strategy(config: &Config, dataset: &Frame) -> Result<Box<dyn Strategy + Sync>> {
    let assets = investable(config, dataset)?;
    match config.strategy.kind {
        StrategyKind::MinimumVariance => {
            let min_weight = config
                .strategy
                .min_weight
                .unwrap_or(MinimumVariance::DEFAULT_MIN_WEIGHT);
            let strategy =
                MinimumVariance::new(min_weight)?.with_features(config.data.features.clone());
            Ok(Box::new(strategy))
        }
        StrategyKind::FactorModel => {
            let train_end = config
                .strategy
                .train_end
                .ok_or_else(|| Error::Config("factor_model strategy requires train_end".into()))?;
            let feature = config
                .data
                .features
                .first()
                .ok_or_else(|| Error::Config("factor_model strategy needs a feature".into()))?;

            let training = dataset.through(train_end);
            info!(
                "Fitting factor model on {} rows through {train_end}",
                training.len()
            );
            let model = FactorModel::fit_assets(&training, feature, &assets)?;
            for (asset, c) in model.assets().iter().zip(model.coefficients()) {
                debug!("  {asset}: alpha={:.6} beta={:.4}", c.alpha, c.beta);
            }

            let min_weight = config
                .strategy
                .min_weight
                .unwrap_or(ProportionalStrategy::<FactorModel>::DEFAULT_MIN_WEIGHT);
            Ok(Box::new(ProportionalStrategy::new(model, min_weight)?))
        }
    }
}

/// Execute a full backtest run.
pub fn run(config: &Config, opts: &RunOptions) -> Result<Report> {
    // 1. Load inputs
    let inputs = Inputs::load(config)?;
    let summary = validate(config, &inputs)?;
    debug!("{summary}");

    // 2. Build the strategy
    let strategy = build_strategy(config, &inputs.dataset)?;
    info!(
        "Running {} from {} over {} dates ({:?} window)",
        strategy.name(),
        config.backtest.start_date,
        summary.evaluation_dates,
        config.window()
    );

    // 3. Execute, simulate, report
    let backtest = Backtest::new(strategy.as_ref(), &inputs.dataset, config.backtest.start_date)
        .with_returns(inputs.returns())
        .with_window(config.window());
    let report = if config.backtest.parallel {
        backtest.run_parallel(config.report_config())?
    } else {
        backtest.run(config.report_config())?
    };

    if report.metrics().sharpe_ratio.is_none() {
        warn!("Sharpe ratio undefined (zero or undefined volatility)");
    }
    info!(
        "Final value {:.2} over {} periods",
        report.metrics().final_value,
        report.metrics().num_periods
    );

    // 4. Write results
    if opts.no_write {
        info!("Skipping output (--no-write)");
    } else {
        let written = write_outputs(&config.output.dir, &report)?;
        info!("Wrote {} files to {}", written.len(), config.output.dir.display());
    }

    Ok(report)
}

/// Write weights, breakdown, values, returns and metrics to `dir`.
pub fn write_outputs(dir: &Path, report: &Report) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let weights = dir.join("weights.csv");
    data::write_frame(&weights, report.weights())?;
    let breakdown = dir.join("breakdown.csv");
    data::write_frame(&breakdown, report.breakdown())?;
    let values = dir.join("values.csv");
    data::write_series(&values, report.portfolio_values())?;
    let returns = dir.join("returns.csv");
    data::write_series(&returns, report.portfolio_returns())?;

    let metrics = dir.join("metrics.json");
    let json = serde_json::to_string_pretty(report.metrics())?;
    std::fs::write(&metrics, json)?;

    Ok(vec![weights, breakdown, values, returns, metrics])
}

/// Print the report to stdout.
pub fn print_report(report: &Report) {
    println!("\n{}", report.strategy_name());
    println!("{}", "=".repeat(report.strategy_name().len()));
    for (label, value) in report.metrics_table() {
        match value {
            Some(v) => println!("  {label:<22} {v:>10.2}"),
            None => println!("  {label:<22} {:>10}", "undefined"),
        }
    }
    println!();
    print!("{}", report.metrics());

    let weights = report.weights();
    println!("\nWeights ({} rebalances, last 5):", weights.len());
    println!("  {:<12} {}", "Date", weights.columns().join("  "));
    for (date, row) in weights.iter().skip(weights.len().saturating_sub(5)) {
        let cells: Vec<String> = row.iter().map(|w| format!("{w:.4}")).collect();
        println!("  {:<12} {}", date.to_string(), cells.join("  "));
    }

    let returns = report.percentage_returns();
    println!("\nReturns (last 5):");
    for (date, r) in returns.iter().skip(returns.len().saturating_sub(5)) {
        println!("  {:<12} {r:>8.2} %", date.to_string());
    }
}
