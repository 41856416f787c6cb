#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk distribution statistics for a selected region.
//!
//! Computes, for the cells intersecting a region polygon, the percentage
//! share of each rounded risk bucket. The dashboard renders the result as
//! the per-municipality proportion chart.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use roadrisk_map_analytics_models::BucketShare;
use roadrisk_map_grid_models::GridCell;
use roadrisk_map_spatial::cells_intersecting;

/// Computes the bucket distribution of cells intersecting a region.
///
/// Selection uses the same non-strict intersection predicate as the
/// aggregation, so boundary-straddling cells are included. Zero-risk cells
/// participate like any other bucket; cells that have not been aggregated
/// yet are ignored. An empty selection yields an empty distribution.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn risk_distribution(cells: &[GridCell], region: &MultiPolygon<f64>) -> Vec<BucketShare> {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    let mut total: u64 = 0;

    for cell in cells_intersecting(cells, region) {
        let Some(risk) = cell.risk else {
            continue;
        };
        *counts.entry(risk.risk_mean_rounded).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        log::debug!("No aggregated cells intersect the selected region");
        return Vec::new();
    }

    counts
        .into_iter()
        .map(|(bucket, count)| BucketShare {
            bucket,
            count,
            percent: count as f64 / total as f64 * 100.0,
        })
        .collect()
}
