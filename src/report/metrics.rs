//! Performance metrics over a portfolio value series.

use crate::error::{Error, Result};

use super::ReportConfig;

/// Volatility at or below this is treated as zero when computing Sharpe.
const VOLATILITY_EPSILON: f64 = 1e-12;

/// Computed performance metrics for a simulated portfolio.
///
/// Returns and volatility are on the same base-100 scale as the portfolio
/// value: a `total_return` of 11.1 means the portfolio grew from 100 to 111.1.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    /// Portfolio value on the last date
    pub final_value: f64,
    /// Final value minus the initial value
    pub total_return: f64,
    /// Sample standard deviation of period returns, in percent, annualized.
    /// `None` with fewer than two return periods.
    pub annualized_volatility: Option<f64>,
    /// `(total_return - risk_free_rate) / annualized_volatility`.
    /// `None` when volatility is undefined or zero.
    pub sharpe_ratio: Option<f64>,
    /// Maximum drawdown (as positive fraction, e.g., 0.20 = 20% peak-to-trough)
    pub max_drawdown: f64,
    /// Number of return periods (one fewer than the number of values)
    pub num_periods: usize,
    /// Periods with positive return
    pub winning_periods: usize,
    /// Periods with negative return
    pub losing_periods: usize,
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance Metrics")?;
        writeln!(f, "  Final value:     {:>8.2}", self.final_value)?;
        writeln!(f, "  Total return:    {:>8.2}", self.total_return)?;
        writeln!(f, "  Volatility:      {:>8}", fmt_optional(self.annualized_volatility))?;
        writeln!(f, "  Sharpe:          {:>8}", fmt_optional(self.sharpe_ratio))?;
        writeln!(f, "  Max drawdown:    {:>8.2}%", self.max_drawdown * 100.0)?;
        writeln!(
            f,
            "  Win/Loss/Total:  {}/{}/{}",
            self.winning_periods, self.losing_periods, self.num_periods
        )
    }
}

fn fmt_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "undefined".to_string(),
    }
}

/// Period-over-period percent change. One element shorter than `values`.
pub fn pct_change(values: &[f64]) -> Result<Vec<f64>> {
    values
        .windows(2)
        .map(|pair| {
            if pair[0] == 0.0 {
                return Err(Error::NonFinite("portfolio return"));
            }
            Ok(pair[1] / pair[0] - 1.0)
        })
        .collect()
}

/// Compute metrics from a portfolio value series.
///
/// # Arguments
///
/// * `values`: Portfolio value on each date, after that date's return
/// * `config`: Initial value, risk-free reference return and annualization factor
///
/// Returns `EmptyRange` if `values` is empty.
pub fn compute_metrics(values: &[f64], config: &ReportConfig) -> Result<Metrics> {
    let Some(&final_value) = values.last() else {
        return Err(Error::EmptyRange);
    };

    let returns = pct_change(values)?;
    let n = returns.len();

    let total_return = final_value - config.initial_value;

    let annualized_volatility = if n > 1 {
        let mean = returns.iter().sum::<f64>() / n as f64;
        let variance = returns.iter().map(|&r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(variance.sqrt() * 100.0 * config.periods_per_year.sqrt())
    } else {
        None
    };

    let sharpe_ratio = annualized_volatility
        .filter(|vol| *vol > VOLATILITY_EPSILON)
        .map(|vol| (total_return - config.risk_free_rate) / vol);

    let winning_periods = returns.iter().filter(|&&r| r > 0.0).count();
    let losing_periods = returns.iter().filter(|&&r| r < 0.0).count();

    Ok(Metrics {
        final_value,
        total_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown: compute_max_drawdown(config.initial_value, values),
        num_periods: n,
        winning_periods,
        losing_periods,
    })
}

/// Compute maximum drawdown from a value series, counting the initial value as the first peak.
fn compute_max_drawdown(initial_value: f64, values: &[f64]) -> f64 {
    let mut peak = initial_value;
    let mut max_dd = 0.0_f64;

    for &v in values {
        if v > peak {
            peak = v;
        }
        let dd = (peak - v) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }

    max_dd
}
