#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI tool for aggregating road segment risk onto the hexagonal grid.
//!
//! Prepares the data the dashboard serves: loads the segment and grid
//! GeoJSON files, computes per-cell mean risk, and persists the augmented
//! grid snapshot. Re-running against an up-to-date snapshot is a no-op.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roadrisk_map_cli_utils::IndicatifProgress;
use roadrisk_map_generate::{AggregateArgs, RunOutcome, run_aggregation, snapshot_status};

#[derive(Parser)]
#[command(name = "roadrisk_map_generate", about = "Risk grid aggregation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate segment risk onto the grid and persist the snapshot
    Aggregate {
        /// Directory containing the input GeoJSON files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Recompute even if an up-to-date snapshot exists
        #[arg(long)]
        force: bool,
    },
    /// Report whether the persisted snapshot is up-to-date
    Status {
        /// Directory containing the input GeoJSON files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = roadrisk_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate { data_dir, force } => {
            let progress = IndicatifProgress::cells_bar(&multi, "Aggregating risk grid...");
            let outcome = run_aggregation(&AggregateArgs { data_dir, force }, Some(progress))?;
            match outcome {
                RunOutcome::UpToDate => log::info!("Nothing to do"),
                RunOutcome::Generated => log::info!("Snapshot generated"),
            }
        }
        Commands::Status { data_dir } => {
            let status = snapshot_status(&data_dir)?;
            log::info!("Snapshot status: {status:?}");
        }
    }

    Ok(())
}
