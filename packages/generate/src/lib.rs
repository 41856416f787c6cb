#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for the risk grid aggregation pipeline.
//!
//! Runs the batch data-preparation step behind the dashboard: ensures the
//! municipality boundaries are extracted, loads the road segments and hex
//! grid, aggregates segment risk onto the grid, and persists the result as
//! a GeoJSON snapshot.
//!
//! The snapshot memoizes the computation: a run that finds an up-to-date
//! snapshot (every cell carrying derived fields) skips recomputation
//! entirely, unless `--force` is given. The snapshot never expires and is
//! never invalidated automatically; delete it (or pass `--force`) after
//! changing the grid definition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use roadrisk_map_aggregate::{aggregate, aggregate_status};
use roadrisk_map_geodata::progress::{ProgressCallback, null_progress};
use roadrisk_map_geodata::{GRID_FILE, MUNICIPALITIES_ARCHIVE, MUNICIPALITIES_FILE, SEGMENTS_FILE};
use roadrisk_map_grid_models::AggregateStatus;

/// Shared arguments for the aggregation pipeline.
pub struct AggregateArgs {
    /// Directory holding the input GeoJSON files and the snapshot.
    pub data_dir: PathBuf,
    /// Recompute even if an up-to-date snapshot exists.
    pub force: bool,
}

/// What a pipeline run ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// An up-to-date snapshot was found; nothing was recomputed.
    UpToDate,
    /// The aggregation ran and a new snapshot was persisted.
    Generated,
}

/// Runs the aggregation pipeline with snapshot memoization.
///
/// Probes the persisted snapshot first and short-circuits when it is
/// fresh. A snapshot that exists but is missing derived fields on some
/// cells is treated as stale and recomputed from the raw inputs.
///
/// # Errors
///
/// Returns an error if any input is missing or degenerate, or if the
/// snapshot cannot be written.
pub fn run_aggregation(
    args: &AggregateArgs,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let progress = progress.unwrap_or_else(null_progress);

    // Upstream contract with the loaders: boundary file exists on disk
    // before anything is loaded.
    roadrisk_map_archive::ensure_extracted(
        &args.data_dir.join(MUNICIPALITIES_FILE),
        &args.data_dir.join(MUNICIPALITIES_ARCHIVE),
    )?;

    let grid_path = args.data_dir.join(GRID_FILE);
    let store = roadrisk_map_geodata::store_path(&grid_path);

    if args.force {
        log::info!("--force given, recomputing snapshot");
    } else if store.exists() {
        // A corrupt snapshot is treated like a stale one and rebuilt.
        match roadrisk_map_geodata::load_cells(&store) {
            Ok(cells) if aggregate_status(&cells).is_fresh() => {
                log::info!(
                    "Snapshot {} is up-to-date, skipping aggregation",
                    store.display()
                );
                return Ok(RunOutcome::UpToDate);
            }
            Ok(_) => log::info!(
                "Snapshot {} is missing derived fields, recomputing",
                store.display()
            ),
            Err(e) => log::warn!("Failed to load snapshot {}: {e}", store.display()),
        }
    }

    progress.set_message("Loading road segments...".to_string());
    let segments = roadrisk_map_geodata::load_segments(&args.data_dir.join(SEGMENTS_FILE))?;

    progress.set_message("Loading grid cells...".to_string());
    let cells = roadrisk_map_geodata::load_cells(&grid_path)?;

    progress.set_message("Aggregating segment risk onto grid...".to_string());
    let aggregated = aggregate(&cells, &segments, &progress);

    roadrisk_map_geodata::save_cells(&store, &aggregated)?;
    progress.finish(format!(
        "Aggregated {} cells into {}",
        aggregated.len(),
        store.display()
    ));

    Ok(RunOutcome::Generated)
}

/// Reports whether the persisted snapshot is up-to-date.
///
/// A missing snapshot is simply [`AggregateStatus::NeedsComputation`];
/// only an unreadable or corrupt one is an error.
///
/// # Errors
///
/// Returns an error if the snapshot exists but cannot be loaded.
pub fn snapshot_status(data_dir: &Path) -> Result<AggregateStatus, Box<dyn std::error::Error>> {
    let store = roadrisk_map_geodata::store_path(&data_dir.join(GRID_FILE));
    if !store.exists() {
        return Ok(AggregateStatus::NeedsComputation);
    }

    let cells = roadrisk_map_geodata::load_cells(&store)?;
    Ok(aggregate_status(&cells))
}
