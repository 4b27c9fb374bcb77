//! CLI entry point for the sleevebook rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use sleevebook::Method;

use sleevebook_rebalancer::config::Config;
use sleevebook_rebalancer::error::Error;
use sleevebook_rebalancer::execution::{self, PlanOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Sleeve-based rebalancing and tax-loss harvesting planner")]
#[command(version)]
struct Cli {
    /// Path to config.toml (engine defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the trade plan for a snapshot
    Plan {
        /// Path to the snapshot JSON
        snapshot: PathBuf,

        /// allocation, tlhSwap, tlhRebalance or investCash
        #[arg(long, default_value = "allocation")]
        method: Method,

        /// investCash: deploy at most this many dollars of the cash balance
        #[arg(long)]
        cash_amount: Option<f64>,

        /// Let the last buy of each sleeve round up past available cash
        #[arg(long)]
        allow_overinvestment: bool,

        /// Overinvestment tolerance in percent
        #[arg(long)]
        max_overinvestment_pct: Option<f64>,

        /// Write trades as JSON Lines to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Exit with status 2 if any trade is blocked
        #[arg(long)]
        strict: bool,
    },

    /// Show sleeve drift against the model
    Drift {
        /// Path to the snapshot JSON
        snapshot: PathBuf,
    },

    /// Check a snapshot without planning
    Validate {
        /// Path to the snapshot JSON
        snapshot: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let result = match cli.command {
        Command::Plan {
            snapshot,
            method,
            cash_amount,
            allow_overinvestment,
            max_overinvestment_pct,
            output,
            strict,
        } => {
            let opts = PlanOptions {
                method,
                cash_amount,
                allow_overinvestment,
                max_overinvestment_pct,
                output,
                strict,
            };
            execution::run(&config, &snapshot, &opts).map(|_| ())
        }
        Command::Drift { snapshot } => execution::run_drift(&snapshot).map(|_| ()),
        Command::Validate { snapshot } => execution::run_validate(&snapshot),
    };

    if let Err(e) = result {
        match &e {
            Error::Blocked(_) => {
                eprintln!("\nStrict: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
