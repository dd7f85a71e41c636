//! Edge case tests: degenerate inputs, misaligned tables, failing strategies.

use chrono::{Days, NaiveDate};
use nanofolio::executor::{self, Window};
use nanofolio::normalize::{normalize_row, proportional_weights};
use nanofolio::optimize::{ProjectedGradient, min_variance_weights};
use nanofolio::simulate::simulate;
use nanofolio::strategy::{Coefficients, FactorModel, MinimumVariance, ProportionalStrategy};
use nanofolio::{
    Backtest, Error, ErrorKind, Frame, FrameBuilder, Report, ReportConfig, Result, Strategy,
};

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Days::new(n)
}

fn ab() -> Vec<String> {
    vec!["A".into(), "B".into()]
}

// ============================================================================
// Frame construction
// ============================================================================

#[test]
fn duplicate_dates_rejected() {
    let err = Frame::new(vec![day(0), day(0)], ab(), vec![vec![0.0; 2]; 2]).unwrap_err();
    assert_eq!(err, Error::UnorderedIndex { date: day(0) });
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn ragged_rows_rejected() {
    let err = Frame::new(vec![day(0), day(1)], ab(), vec![vec![0.0; 2], vec![0.0]]).unwrap_err();
    assert_eq!(
        err,
        Error::ShapeMismatch {
            row: 1,
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn duplicate_columns_rejected() {
    let err = Frame::new(vec![day(0)], vec!["A".into(), "A".into()], vec![vec![0.0; 2]]).unwrap_err();
    assert_eq!(err, Error::DuplicateColumn("A".into()));
}

#[test]
fn builder_rejects_out_of_order_push() {
    let mut builder = FrameBuilder::new(ab()).unwrap();
    builder.push(day(3), vec![0.5, 0.5]).unwrap();
    assert!(builder.push(day(3), vec![0.5, 0.5]).is_err());
    assert!(builder.push(day(1), vec![0.5, 0.5]).is_err());
    assert!(builder.push(day(4), vec![1.0]).is_err());
    assert_eq!(builder.finish().len(), 1);
}

// ============================================================================
// Normalizer
// ============================================================================

#[test]
fn single_asset_gets_everything() {
    assert_eq!(normalize_row(&[0.03], 0.5).unwrap(), vec![1.0]);
}

#[test]
fn all_negative_scores_still_normalize() {
    let w = normalize_row(&[-0.01, -0.03], 0.0).unwrap();
    assert!((w[0] - 0.25).abs() < 1e-12);
    assert!((w[1] - 0.75).abs() < 1e-12);
}

#[test]
fn zero_row_fails_whole_table() {
    let scores = Frame::new(
        vec![day(0), day(1)],
        ab(),
        vec![vec![1.0, 2.0], vec![0.0, 0.0]],
    )
    .unwrap();
    let err = proportional_weights(&scores, 0.1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Numerical);
}

#[test]
fn empty_score_row() {
    assert!(matches!(
        normalize_row(&[], 0.0).unwrap_err(),
        Error::InvalidConfig(_)
    ));
}

// ============================================================================
// Optimizer
// ============================================================================

#[test]
fn duplicated_asset_is_singular() {
    let rows: Vec<Vec<f64>> = (0..20)
        .map(|t| {
            let x = (t as f64 * 0.8).sin() * 0.01;
            vec![x, x, (t as f64 * 1.9).cos() * 0.01]
        })
        .collect();
    let err = min_variance_weights(&rows, 0.0, &ProjectedGradient::default()).unwrap_err();
    assert!(matches!(err, Error::SingularCovariance { .. }));
    assert_eq!(err.kind(), ErrorKind::Numerical);
}

#[test]
fn nan_in_window_is_numerical() {
    let mut rows = vec![vec![0.01, 0.02]; 5];
    rows[2][1] = f64::NAN;
    let err = min_variance_weights(&rows, 0.0, &ProjectedGradient::default()).unwrap_err();
    assert_eq!(err, Error::NonFinite("return window"));
}

#[test]
fn floor_of_one_over_n_pins_equal_weights() {
    let rows: Vec<Vec<f64>> = (0..10)
        .map(|t| {
            let x = t as f64;
            vec![(x * 0.4).sin() * 0.01, (x * 1.1).cos() * 0.03]
        })
        .collect();
    let w = min_variance_weights(&rows, 0.5, &ProjectedGradient::default()).unwrap();
    assert!((w[0] - 0.5).abs() < 1e-12);
    assert!((w[1] - 0.5).abs() < 1e-12);
}

#[test]
fn infeasible_floor_is_config_error() {
    let strategy = MinimumVariance::new(0.4).unwrap();
    let history = Frame::new(
        (0..10).map(day).collect(),
        vec!["A".into(), "B".into(), "C".into()],
        (0..10)
            .map(|t| {
                let x = t as f64;
                vec![(x * 0.4).sin(), (x * 1.1).cos(), (x * 2.3).sin()]
            })
            .collect(),
    )
    .unwrap();
    let err = strategy.execute(&history).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn feature_columns_are_not_weighted() {
    let history = Frame::new(
        (0..12).map(day).collect(),
        vec!["A".into(), "MKT".into(), "B".into()],
        (0..12)
            .map(|t| {
                let x = t as f64;
                vec![(x * 0.4).sin() * 0.01, 0.0, (x * 1.1).cos() * 0.02]
            })
            .collect(),
    )
    .unwrap();
    let strategy = MinimumVariance::new(0.05)
        .unwrap()
        .with_features(vec!["MKT".into()]);
    let weights = strategy.execute(&history).unwrap();
    assert_eq!(weights.columns(), &["A", "B"]);
    assert_eq!(weights.index(), &[day(11)]);
}

// ============================================================================
// Executor
// ============================================================================

/// Emits no row for one date of the run.
struct Gap(NaiveDate);

impl Strategy for Gap {
    fn name(&self) -> &str {
        "gap"
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        let dates: Vec<NaiveDate> = history
            .index()
            .iter()
            .copied()
            .filter(|d| *d != self.0)
            .collect();
        let rows = vec![vec![0.5, 0.5]; dates.len()];
        Frame::new(dates, ab(), rows)
    }
}

#[test]
fn strategy_gap_fails_whole_run() {
    let history = Frame::new((0..5).map(day).collect(), ab(), vec![vec![0.0; 2]; 5]).unwrap();
    let err = executor::run(&Gap(day(3)), &history, day(0), Window::Expanding).unwrap_err();
    assert_eq!(
        err,
        Error::MissingStrategyRow {
            strategy: "gap".into(),
            date: day(3)
        }
    );
    assert_eq!(err.kind(), ErrorKind::Strategy);
}

#[test]
fn extra_rows_from_strategy_are_discarded() {
    let history = Frame::new((0..5).map(day).collect(), ab(), vec![vec![0.0; 2]; 5]).unwrap();
    let schedule = executor::run(&Gap(day(10)), &history, day(2), Window::Expanding).unwrap();
    assert_eq!(schedule.index(), &[day(2), day(3), day(4)]);
}

#[test]
fn boxed_strategy_runs() {
    let history = Frame::new((0..3).map(day).collect(), ab(), vec![vec![0.0; 2]; 3]).unwrap();
    let boxed: Box<dyn Strategy> = Box::new(Gap(day(10)));
    let schedule = executor::run(&boxed, &history, day(0), Window::Sliding(1)).unwrap();
    assert_eq!(schedule.len(), 3);
}

#[test]
fn start_before_history_uses_every_date() {
    let history = Frame::new((5..8).map(day).collect(), ab(), vec![vec![0.0; 2]; 3]).unwrap();
    let schedule = executor::run(&Gap(day(0)), &history, day(0), Window::Expanding).unwrap();
    assert_eq!(schedule.len(), 3);
}

/// Holds a leveraged position every day.
struct Leveraged;

impl Strategy for Leveraged {
    fn name(&self) -> &str {
        "leveraged"
    }

    fn execute(&self, history: &Frame) -> Result<Frame> {
        let last = history.last_date().ok_or(Error::EmptyRange)?;
        Frame::new(vec![last], ab(), vec![vec![1.5, 0.7]])
    }
}

#[test]
fn leveraged_weights_fail_the_backtest() {
    let history = Frame::new((0..5).map(day).collect(), ab(), vec![vec![0.01, 0.02]; 5]).unwrap();
    let err = Backtest::new(&Leveraged, &history, day(1))
        .run(ReportConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidWeights { date, .. } if date == day(1)));
    assert_eq!(err.kind(), ErrorKind::Strategy);
}

fn factor_strategy() -> ProportionalStrategy<FactorModel> {
    let model = FactorModel::from_coefficients(
        "MKT",
        ab(),
        vec![
            Coefficients { alpha: 0.0, beta: 1.0 },
            Coefficients { alpha: 0.0, beta: 1.0 },
        ],
    )
    .unwrap();
    ProportionalStrategy::new(model, 0.1).unwrap()
}

fn market_with_gap() -> Frame {
    let mkt = [f64::NAN, 0.01, 0.02, 0.03];
    Frame::new(
        (0..4).map(day).collect(),
        vec!["A".into(), "B".into(), "MKT".into()],
        mkt.iter().map(|m| vec![0.0, 0.0, *m]).collect(),
    )
    .unwrap()
}

#[test]
fn past_feature_gap_does_not_fail_later_dates() {
    let strategy = factor_strategy();
    let history = market_with_gap();

    let expanding = executor::run(&strategy, &history, day(1), Window::Expanding).unwrap();
    assert_eq!(expanding.index(), &[day(1), day(2), day(3)]);
    for row in expanding.rows() {
        assert!((row[0] - 0.5).abs() < 1e-12);
        assert!((row[1] - 0.5).abs() < 1e-12);
    }

    let sliding = executor::run(&strategy, &history, day(2), Window::Sliding(3)).unwrap();
    assert_eq!(sliding.len(), 2);
}

#[test]
fn feature_gap_on_evaluation_date_fails() {
    let err = executor::run(&factor_strategy(), &market_with_gap(), day(0), Window::Expanding)
        .unwrap_err();
    assert_eq!(err, Error::NonFinite("features"));
}

#[test]
fn empty_history() {
    let history = Frame::empty(ab()).unwrap();
    assert_eq!(
        executor::run(&Gap(day(0)), &history, day(0), Window::Expanding).unwrap_err(),
        Error::EmptyRange
    );
}

// ============================================================================
// Simulator and report
// ============================================================================

#[test]
fn weights_with_gap_in_return_dates() {
    let weights = Frame::new(vec![day(0), day(2)], ab(), vec![vec![0.5, 0.5]; 2]).unwrap();
    let returns = Frame::new(vec![day(0), day(1), day(2)], ab(), vec![vec![0.01; 2]; 3]).unwrap();
    let err = simulate(&weights, &returns, 100.0).unwrap_err();
    assert_eq!(err, Error::Alignment { date: day(1) });
    assert_eq!(err.kind(), ErrorKind::Alignment);
}

#[test]
fn total_loss_stops_the_report() {
    let weights = Frame::new(vec![day(0), day(1)], ab(), vec![vec![1.0, 0.0]; 2]).unwrap();
    let returns = Frame::new(
        vec![day(0), day(1)],
        ab(),
        vec![vec![-1.0, 0.0], vec![0.05, 0.0]],
    )
    .unwrap();
    let err = Report::analyze("wipeout", weights, &returns, ReportConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Numerical);
}

#[test]
fn single_date_report() {
    let weights = Frame::new(vec![day(0)], ab(), vec![vec![0.5, 0.5]]).unwrap();
    let returns = Frame::new(vec![day(0)], ab(), vec![vec![0.02, 0.04]]).unwrap();
    let report = Report::analyze("one", weights, &returns, ReportConfig::default()).unwrap();

    assert!((report.metrics().final_value - 103.0).abs() < 1e-9);
    assert!(report.portfolio_returns().is_empty());
    assert_eq!(report.metrics().annualized_volatility, None);
    assert_eq!(report.metrics().sharpe_ratio, None);
    assert!(format!("{}", report.metrics()).contains("undefined"));
}
