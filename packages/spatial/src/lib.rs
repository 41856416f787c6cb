#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index over road segments.
//!
//! Builds an R-tree of segment envelopes once per run and answers
//! "which segments intersect this cell polygon" queries with an envelope
//! prefilter followed by the exact intersection predicate. Shared by the
//! aggregation pipeline and the dashboard's region statistics.

use geo::{BoundingRect, Intersects, MultiPolygon, Rect};
use roadrisk_map_grid_models::{GridCell, RoadSegment};
use rstar::{AABB, RTree, RTreeObject};

/// A road segment stored in the R-tree with its precomputed envelope.
struct SegmentEntry {
    envelope: AABB<[f64; 2]>,
    segment: RoadSegment,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree index over the road segment collection.
///
/// Constructed once and queried read-only. The envelope test only
/// prefilters; candidates are confirmed with the exact geometric
/// intersection, so touching-only geometries are still reported.
pub struct SegmentIndex {
    tree: RTree<SegmentEntry>,
}

impl SegmentIndex {
    /// Builds the index from the loaded segment collection.
    #[must_use]
    pub fn build(segments: Vec<RoadSegment>) -> Self {
        let entries: Vec<SegmentEntry> = segments
            .into_iter()
            .map(|segment| SegmentEntry {
                envelope: envelope_of(&segment.geometry),
                segment,
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built segment index with {} entries", tree.size());
        Self { tree }
    }

    /// Number of segments in the index.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Returns every segment whose geometry intersects the cell polygon.
    ///
    /// The intersection test is non-strict: geometries sharing only a
    /// single boundary point count the same as fully overlapping ones. No
    /// buffering or distance threshold is applied.
    #[must_use]
    pub fn intersecting(&self, cell: &MultiPolygon<f64>) -> Vec<&RoadSegment> {
        let Some(rect) = cell.bounding_rect() else {
            return Vec::new();
        };
        let query_env =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.segment.geometry.intersects(cell))
            .map(|entry| &entry.segment)
            .collect()
    }
}

/// Selects the cells whose geometry intersects a region polygon.
///
/// Used for per-municipality statistics: the selection predicate is the
/// same non-strict intersection the aggregation uses, so a cell straddling
/// the region boundary is included.
#[must_use]
pub fn cells_intersecting<'a>(
    cells: &'a [GridCell],
    region: &MultiPolygon<f64>,
) -> Vec<&'a GridCell> {
    cells
        .iter()
        .filter(|cell| cell.geometry.intersects(region))
        .collect()
}

/// Computes the bounding box envelope for a geometry.
fn envelope_of<G>(geometry: &G) -> AABB<[f64; 2]>
where
    G: BoundingRect<f64, Output = Option<Rect<f64>>>,
{
    geometry.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiLineString, Polygon};

    use super::*;

    fn segment(coords: Vec<(f64, f64)>, risk_value: f64) -> RoadSegment {
        RoadSegment {
            geometry: MultiLineString::new(vec![LineString::from(coords)]),
            risk_value,
        }
    }

    fn unit_cell(min_x: f64, min_y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x + 1.0, min_y),
                (min_x + 1.0, min_y + 1.0),
                (min_x, min_y + 1.0),
                (min_x, min_y),
            ]),
            vec![],
        )])
    }

    #[test]
    fn finds_segment_crossing_cell() {
        let index = SegmentIndex::build(vec![segment(vec![(-1.0, 0.5), (2.0, 0.5)], 3.0)]);
        let hits = index.intersecting(&unit_cell(0.0, 0.0));
        assert_eq!(hits.len(), 1);
        assert!((hits[0].risk_value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ignores_disjoint_segment() {
        let index = SegmentIndex::build(vec![segment(vec![(5.0, 5.0), (6.0, 5.0)], 3.0)]);
        assert!(index.intersecting(&unit_cell(0.0, 0.0)).is_empty());
    }

    #[test]
    fn ignores_segment_whose_envelope_overlaps_but_geometry_does_not() {
        // Diagonal segment whose bounding box covers the cell while the
        // line itself passes outside it.
        let index = SegmentIndex::build(vec![segment(vec![(-2.0, 2.5), (2.5, -2.0)], 1.0)]);
        assert!(index.intersecting(&unit_cell(1.5, 1.5)).is_empty());
    }

    #[test]
    fn touching_endpoint_counts_as_intersecting() {
        // Segment ends exactly on the cell corner.
        let index = SegmentIndex::build(vec![segment(vec![(-1.0, -1.0), (0.0, 0.0)], 2.0)]);
        let hits = index.intersecting(&unit_cell(0.0, 0.0));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn selects_cells_intersecting_region() {
        let cells = vec![
            GridCell {
                identity: "a".to_string(),
                geometry: unit_cell(0.0, 0.0),
                risk: None,
            },
            GridCell {
                identity: "b".to_string(),
                geometry: unit_cell(10.0, 10.0),
                risk: None,
            },
        ];
        let region = unit_cell(0.5, 0.5);

        let selected = cells_intersecting(&cells, &region);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].identity, "a");
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = SegmentIndex::build(Vec::new());
        assert_eq!(index.size(), 0);
        assert!(index.intersecting(&unit_cell(0.0, 0.0)).is_empty());
    }
}
