//! nanofolio-runner: config-driven backtests on CSV data.
//!
//! Reads a date-indexed returns table, builds the configured strategy,
//! runs the nanofolio executor, simulator and reporter, and writes the
//! weight schedule, value breakdown and metrics.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
