//! CLI entry point for the nanofolio backtest runner.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use nanofolio_runner::config::Config;
use nanofolio_runner::pipeline::{self, Inputs, RunOptions};

#[derive(Parser)]
#[command(name = "backtest")]
#[command(about = "Rolling-window portfolio backtests on CSV return data")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the backtest and print metrics, weights and returns
    Run {
        /// Print results without writing files
        #[arg(long)]
        no_write: bool,
    },

    /// Load config and data and report their shapes
    Validate,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { no_write } => {
            pipeline::run(&config, &RunOptions { no_write }).map(|report| {
                pipeline::print_report(&report);
            })
        }
        Command::Validate => Inputs::load(&config)
            .and_then(|inputs| pipeline::validate(&config, &inputs))
            .map(|summary| print!("{summary}")),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}
