//! Integration tests for the runner pipeline: CSV in, report and files out.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use nanofolio_runner::config::Config;
use nanofolio_runner::error::Error;
use nanofolio_runner::pipeline::{self, Inputs, RunOptions};

fn d0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
}

/// 60 days of returns for three assets driven by a market column plus
/// independent noise.
fn returns_csv() -> String {
    let mut out = String::from("Date,AAA,BBB,CCC,^GSPC\n");
    for t in 0..60u64 {
        let x = t as f64;
        let mkt = 0.005 * (0.9 * x).sin();
        let a = 0.010 + 0.8 * mkt + 0.001 * (1.7 * x).sin();
        let b = 0.025 + 1.2 * mkt + 0.001 * (2.3 * x).cos();
        let c = 0.015 + 0.4 * mkt + 0.001 * (0.5 * x).sin();
        let date = d0() + Days::new(t);
        out.push_str(&format!("{date},{a:.6},{b:.6},{c:.6},{mkt:.6}\n"));
    }
    out
}

fn setup(strategy: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("returns.csv"), returns_csv()).unwrap();
    let config = format!(
        r#"
[data]
dataset = "returns.csv"
features = ["^GSPC"]

[backtest]
start_date = "2021-01-31"

[strategy]
{strategy}

[output]
dir = "out"
"#
    );
    let path = dir.path().join("config.toml");
    fs::write(&path, config).unwrap();
    (dir, path)
}

fn assert_valid_weights(path: &Path) {
    let weights = fs::read_to_string(path).unwrap();
    let mut lines = weights.lines();
    assert_eq!(lines.next(), Some("Date,AAA,BBB,CCC"));
    let mut rows = 0;
    for line in lines {
        let sum: f64 = line.split(',').skip(1).map(|v| v.parse::<f64>().unwrap()).sum();
        assert!((sum - 1.0).abs() < 1e-9, "row {line} sums to {sum}");
        rows += 1;
    }
    assert_eq!(rows, 30);
}

#[test]
fn minimum_variance_end_to_end() {
    let (dir, config_path) = setup("kind = \"minimum_variance\"\nmin_weight = 0.05");
    let config = Config::load(&config_path).unwrap();

    let report = pipeline::run(&config, &RunOptions { no_write: false }).unwrap();

    assert_eq!(report.strategy_name(), "Minimum Variance Portfolio");
    assert_eq!(report.weights().columns(), &["AAA", "BBB", "CCC"]);
    assert_eq!(report.weights().len(), 30);
    assert_eq!(report.metrics().num_periods, 29);

    let out = dir.path().join("out");
    for name in ["weights.csv", "breakdown.csv", "values.csv", "returns.csv", "metrics.json"] {
        assert!(out.join(name).exists(), "missing {name}");
    }
    assert_valid_weights(&out.join("weights.csv"));

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("metrics.json")).unwrap()).unwrap();
    let final_value = metrics["final_value"].as_f64().unwrap();
    assert!((final_value - report.metrics().final_value).abs() < 1e-9);
}

#[test]
fn factor_model_end_to_end() {
    let (dir, config_path) = setup(
        "kind = \"factor_model\"\nmin_weight = 0.2\ntrain_end = \"2021-01-20\"",
    );
    let config = Config::load(&config_path).unwrap();

    let report = pipeline::run(&config, &RunOptions { no_write: false }).unwrap();

    assert_eq!(report.strategy_name(), "Factor Regression");
    assert_valid_weights(&dir.path().join("out/weights.csv"));
    // Mean returns rank BBB > CCC > AAA, and the predictions follow
    for row in report.weights().rows() {
        assert!(row[1] > row[2] && row[2] > row[0]);
    }
}

#[test]
fn no_write_leaves_output_dir_alone() {
    let (dir, config_path) = setup("kind = \"minimum_variance\"");
    let config = Config::load(&config_path).unwrap();
    pipeline::run(&config, &RunOptions { no_write: true }).unwrap();
    assert!(!dir.path().join("out").exists());
}

#[test]
fn parallel_run_matches_sequential() {
    let (_dir, config_path) = setup("kind = \"minimum_variance\"");
    let mut config = Config::load(&config_path).unwrap();
    let seq = pipeline::run(&config, &RunOptions { no_write: true }).unwrap();
    config.backtest.parallel = true;
    let par = pipeline::run(&config, &RunOptions { no_write: true }).unwrap();
    assert_eq!(seq.weights(), par.weights());
}

#[test]
fn validate_reports_shapes() {
    let (_dir, config_path) = setup("kind = \"minimum_variance\"");
    let config = Config::load(&config_path).unwrap();
    let inputs = Inputs::load(&config).unwrap();
    let summary = pipeline::validate(&config, &inputs).unwrap();

    assert_eq!(summary.rows, 60);
    assert_eq!(summary.assets, vec!["AAA", "BBB", "CCC"]);
    assert_eq!(summary.first_date, d0());
    assert_eq!(summary.evaluation_dates, 30);
}

#[test]
fn unknown_feature_column() {
    let (_dir, config_path) = setup("kind = \"minimum_variance\"");
    let toml = fs::read_to_string(&config_path).unwrap().replace("^GSPC", "^DJI");
    fs::write(&config_path, toml).unwrap();
    let config = Config::load(&config_path).unwrap();

    let err = pipeline::run(&config, &RunOptions { no_write: true }).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn too_short_window_exits_with_backtest_failure() {
    let (_dir, config_path) = setup("kind = \"minimum_variance\"");
    let toml = fs::read_to_string(&config_path)
        .unwrap()
        .replace("2021-01-31", "2021-01-01");
    fs::write(&config_path, toml).unwrap();
    let config = Config::load(&config_path).unwrap();

    let err = pipeline::run(&config, &RunOptions { no_write: true }).unwrap_err();
    assert!(matches!(
        err,
        Error::Backtest(nanofolio::Error::SingularCovariance { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

/// Realized returns kept apart from the strategy input: a flat 0.1% per day
/// for every asset.
fn realized_csv(columns: &str) -> String {
    let n = columns.split(',').count();
    let mut out = format!("Date,{columns}\n");
    for t in 0..60u64 {
        let date = d0() + Days::new(t);
        out.push_str(&format!("{date}{}\n", ",0.001".repeat(n)));
    }
    out
}

fn with_market_data(dir: &Path, config_path: &Path, columns: &str) {
    fs::write(dir.join("realized.csv"), realized_csv(columns)).unwrap();
    let toml = fs::read_to_string(config_path).unwrap().replace(
        "dataset = \"returns.csv\"",
        "dataset = \"returns.csv\"\nmarket_data = \"realized.csv\"",
    );
    fs::write(config_path, toml).unwrap();
}

#[test]
fn separate_market_data_drives_the_replay() {
    let (dir, config_path) = setup("kind = \"minimum_variance\"");
    with_market_data(dir.path(), &config_path, "AAA,BBB,CCC");
    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.market_data_path(), dir.path().join("realized.csv").as_path());

    let inputs = Inputs::load(&config).unwrap();
    assert!(inputs.market_data.is_some());
    assert_eq!(inputs.returns().columns(), &["AAA", "BBB", "CCC"]);

    let report = pipeline::run(&config, &RunOptions { no_write: true }).unwrap();
    // Weights still come from the dataset; every period earns the flat 0.1%
    assert_eq!(report.weights().len(), 30);
    let expected = 100.0 * 1.001_f64.powi(30);
    assert!((report.metrics().final_value - expected).abs() < 1e-9);
}

#[test]
fn market_data_missing_an_asset() {
    let (dir, config_path) = setup("kind = \"minimum_variance\"");
    with_market_data(dir.path(), &config_path, "AAA,BBB");
    let config = Config::load(&config_path).unwrap();
    let inputs = Inputs::load(&config).unwrap();

    let err = pipeline::validate(&config, &inputs).unwrap_err();
    assert!(matches!(err, Error::Data { ref reason, .. } if reason.contains("CCC")));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_config_file() {
    let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigRead { .. }));
}
