#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial risk aggregation over the hexagonal grid.
//!
//! For each grid cell, takes the arithmetic mean of the risk values of
//! every road segment intersecting the cell and derives the rounded
//! bucket. A cell intersecting no segments scores zero on both fields and
//! stays in the collection, so downstream statistics count it like any
//! other zero-risk cell.
//!
//! Two deliberate simplifications carried over from the source data
//! methodology:
//!   - A segment that only clips the corner of a cell contributes its full
//!     risk value with the same weight as one traversing the whole cell;
//!     no length-weighting is applied.
//!   - A zero score is stored for cells with no intersecting segments, so
//!     "no risk data" and "measured zero risk" are indistinguishable.

use std::sync::Arc;

use geo::MultiPolygon;
use roadrisk_map_geodata::progress::ProgressCallback;
use roadrisk_map_grid_models::{AggregateStatus, CellRisk, GridCell, RoadSegment};
use roadrisk_map_spatial::SegmentIndex;

/// Probes whether a cell collection already carries derived risk fields.
///
/// Returns [`AggregateStatus::Fresh`] when every cell is aggregated (an
/// empty collection counts as fresh vacuously), else
/// [`AggregateStatus::NeedsComputation`]. The pipeline uses this instead
/// of re-deriving freshness from raw property presence.
#[must_use]
pub fn aggregate_status(cells: &[GridCell]) -> AggregateStatus {
    if cells.iter().all(GridCell::is_aggregated) {
        AggregateStatus::Fresh
    } else {
        AggregateStatus::NeedsComputation
    }
}

/// Computes a risk score for every cell from the intersecting segments.
///
/// Pure with respect to its inputs: returns a new collection instead of
/// mutating the given one, sorted by cell identity so the persisted
/// output is byte-stable across runs regardless of input order.
#[must_use]
pub fn aggregate(
    cells: &[GridCell],
    segments: &[RoadSegment],
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<GridCell> {
    let index = SegmentIndex::build(segments.to_vec());
    log::info!(
        "Aggregating risk for {} cells against {} segments",
        cells.len(),
        index.size()
    );

    progress.set_total(cells.len() as u64);

    let mut aggregated: Vec<GridCell> = cells
        .iter()
        .map(|cell| {
            let risk = cell_risk(&index, &cell.geometry);
            progress.inc(1);
            GridCell {
                identity: cell.identity.clone(),
                geometry: cell.geometry.clone(),
                risk: Some(risk),
            }
        })
        .collect();

    aggregated.sort_by(|a, b| a.identity.cmp(&b.identity));
    aggregated
}

/// Scores one cell from the segments intersecting it.
#[allow(clippy::cast_precision_loss)]
fn cell_risk(index: &SegmentIndex, geometry: &MultiPolygon<f64>) -> CellRisk {
    let mut risks: Vec<f64> = index
        .intersecting(geometry)
        .into_iter()
        .map(|segment| segment.risk_value)
        .collect();

    if risks.is_empty() {
        return CellRisk::ZERO;
    }

    // Fixed summation order keeps the mean bit-identical under input
    // permutation.
    risks.sort_by(f64::total_cmp);
    let sum: f64 = risks.iter().sum();
    CellRisk::from_mean(sum / risks.len() as f64)
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiLineString, Polygon};
    use roadrisk_map_geodata::progress::null_progress;

    use super::*;

    fn segment(coords: Vec<(f64, f64)>, risk_value: f64) -> RoadSegment {
        RoadSegment {
            geometry: MultiLineString::new(vec![LineString::from(coords)]),
            risk_value,
        }
    }

    fn cell(identity: &str, min_x: f64, min_y: f64) -> GridCell {
        GridCell {
            identity: identity.to_string(),
            geometry: MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![
                    (min_x, min_y),
                    (min_x + 1.0, min_y),
                    (min_x + 1.0, min_y + 1.0),
                    (min_x, min_y + 1.0),
                    (min_x, min_y),
                ]),
                vec![],
            )]),
            risk: None,
        }
    }

    #[test]
    fn means_intersecting_segment_risks() {
        // Three segments cross cell "a"; none reach cell "b".
        let cells = vec![cell("a", 0.0, 0.0), cell("b", 10.0, 10.0)];
        let segments = vec![
            segment(vec![(-1.0, 0.2), (2.0, 0.2)], 2.0),
            segment(vec![(-1.0, 0.5), (2.0, 0.5)], 4.0),
            segment(vec![(-1.0, 0.8), (2.0, 0.8)], 6.0),
        ];

        let result = aggregate(&cells, &segments, &null_progress());

        let a = result.iter().find(|c| c.identity == "a").unwrap();
        let risk = a.risk.unwrap();
        assert!((risk.risk_mean - 4.0).abs() < f64::EPSILON);
        assert_eq!(risk.risk_mean_rounded, 4);
    }

    #[test]
    fn cell_without_segments_scores_zero() {
        let cells = vec![cell("b", 10.0, 10.0)];
        let segments = vec![segment(vec![(0.0, 0.0), (1.0, 0.0)], 5.0)];

        let result = aggregate(&cells, &segments, &null_progress());
        assert_eq!(result[0].risk.unwrap(), CellRisk::ZERO);
    }

    #[test]
    fn half_value_rounds_away_from_zero() {
        let cells = vec![cell("c", 0.0, 0.0)];
        let segments = vec![segment(vec![(-1.0, 0.5), (2.0, 0.5)], 2.5)];

        let result = aggregate(&cells, &segments, &null_progress());
        let risk = result[0].risk.unwrap();
        assert!((risk.risk_mean - 2.5).abs() < f64::EPSILON);
        // 2.5 buckets to 3 under round-half-away-from-zero.
        assert_eq!(risk.risk_mean_rounded, 3);
    }

    #[test]
    fn every_cell_gets_a_score() {
        let cells = vec![cell("a", 0.0, 0.0), cell("b", 5.0, 5.0), cell("c", 9.0, 9.0)];
        let segments = vec![segment(vec![(-1.0, 0.5), (2.0, 0.5)], 3.0)];

        let result = aggregate(&cells, &segments, &null_progress());
        assert_eq!(result.len(), 3);
        for c in &result {
            let risk = c.risk.unwrap();
            assert!(risk.risk_mean_rounded >= 0);
        }
    }

    #[test]
    fn segment_order_does_not_change_means() {
        let cells = vec![cell("a", 0.0, 0.0)];
        let segments = vec![
            segment(vec![(-1.0, 0.2), (2.0, 0.2)], 0.1),
            segment(vec![(-1.0, 0.5), (2.0, 0.5)], 0.2),
            segment(vec![(-1.0, 0.8), (2.0, 0.8)], 0.3),
        ];
        let mut permuted = segments.clone();
        permuted.reverse();

        let forward = aggregate(&cells, &segments, &null_progress());
        let backward = aggregate(&cells, &permuted, &null_progress());

        assert_eq!(forward[0].risk, backward[0].risk);
    }

    #[test]
    fn corner_clip_counts_with_full_weight() {
        // One segment traverses the cell, the other only cuts the corner;
        // both contribute their full risk value to the mean.
        let cells = vec![cell("a", 0.0, 0.0)];
        let segments = vec![
            segment(vec![(-1.0, 0.5), (2.0, 0.5)], 2.0),
            segment(vec![(-0.2, 0.5), (0.5, -0.2)], 6.0),
        ];

        let result = aggregate(&cells, &segments, &null_progress());
        let risk = result[0].risk.unwrap();
        assert!((risk.risk_mean - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn output_is_sorted_by_identity() {
        let cells = vec![cell("c", 0.0, 0.0), cell("a", 5.0, 5.0), cell("b", 9.0, 9.0)];
        let result = aggregate(&cells, &[], &null_progress());

        let identities: Vec<&str> = result.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(identities, ["a", "b", "c"]);
    }

    #[test]
    fn aggregated_output_probes_fresh() {
        let cells = vec![cell("a", 0.0, 0.0)];
        assert_eq!(aggregate_status(&cells), AggregateStatus::NeedsComputation);

        let result = aggregate(&cells, &[], &null_progress());
        assert_eq!(aggregate_status(&result), AggregateStatus::Fresh);
    }

    #[test]
    fn reaggregating_fresh_output_is_stable() {
        let cells = vec![cell("a", 0.0, 0.0), cell("b", 10.0, 10.0)];
        let segments = vec![
            segment(vec![(-1.0, 0.5), (2.0, 0.5)], 1.5),
            segment(vec![(-1.0, 0.7), (2.0, 0.7)], 3.5),
        ];

        let once = aggregate(&cells, &segments, &null_progress());
        let twice = aggregate(&once, &segments, &null_progress());
        assert_eq!(once, twice);
    }

    #[test]
    fn mixed_collection_needs_computation() {
        let mut cells = vec![cell("a", 0.0, 0.0), cell("b", 5.0, 5.0)];
        cells[0].risk = Some(CellRisk::ZERO);
        assert_eq!(aggregate_status(&cells), AggregateStatus::NeedsComputation);
    }
}
