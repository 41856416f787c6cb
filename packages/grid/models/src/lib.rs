#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core domain types for the road risk grid.
//!
//! A [`RoadSegment`] is a stretch of road carrying a measured pedestrian
//! risk value. A [`GridCell`] is one hexagon of the fixed grid the state is
//! partitioned into; after aggregation it carries a [`CellRisk`] derived
//! from the segments that intersect it. These types are shared by the
//! aggregation pipeline, the analytics layer, and the dashboard server.

use geo::{MultiLineString, MultiPolygon};
use serde::{Deserialize, Serialize};

/// A road segment with its measured risk attribute.
///
/// Segments are read-only inputs to the aggregation. Collection order is
/// irrelevant; the aggregation result does not depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    /// Segment geometry in the grid's coordinate reference.
    pub geometry: MultiLineString<f64>,
    /// Measured risk for this segment (incidents per km).
    pub risk_value: f64,
}

/// One hexagonal cell of the fixed spatial grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Stable unique key joining computed scores back to the cell for
    /// rendering (the `index` property of the grid file).
    pub identity: String,
    /// Cell polygon in the grid's coordinate reference.
    pub geometry: MultiPolygon<f64>,
    /// Derived risk score; `None` until the aggregation has run.
    pub risk: Option<CellRisk>,
}

impl GridCell {
    /// Whether the derived risk fields have been computed for this cell.
    #[must_use]
    pub const fn is_aggregated(&self) -> bool {
        self.risk.is_some()
    }
}

/// Derived risk score for a cell.
///
/// A cell that intersects no segments stores [`CellRisk::ZERO`], so
/// "no risk data" and "measured zero risk" are indistinguishable here.
/// Downstream statistics count such cells like any other zero-risk cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRisk {
    /// Arithmetic mean of `risk_value` over the intersecting segments.
    pub risk_mean: f64,
    /// `risk_mean` rounded half away from zero; the categorical key for
    /// choropleth coloring and distribution binning.
    pub risk_mean_rounded: i64,
}

impl CellRisk {
    /// The score stored for cells with an empty intersection set.
    pub const ZERO: Self = Self {
        risk_mean: 0.0,
        risk_mean_rounded: 0,
    };

    /// Builds a score from a computed mean, deriving the rounded bucket.
    #[must_use]
    pub fn from_mean(risk_mean: f64) -> Self {
        Self {
            risk_mean,
            risk_mean_rounded: round_risk(risk_mean),
        }
    }
}

/// Rounds a risk mean to its integer bucket, half away from zero.
///
/// This is the one fixed rounding convention for the whole system: 2.5
/// buckets to 3 and -2.5 to -3. Bucket boundaries feed the ordinal color
/// scale, so every consumer must agree on it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_risk(risk_mean: f64) -> i64 {
    risk_mean.round() as i64
}

/// Memoization status of a cell collection.
///
/// Probed before aggregation: a collection whose every cell already
/// carries derived fields is `Fresh` and is not recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    /// Every cell carries a computed score; skip recomputation.
    Fresh,
    /// At least one cell is missing its score; the aggregation must run.
    NeedsComputation,
}

impl AggregateStatus {
    /// Whether the collection is up-to-date.
    #[must_use]
    pub const fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// A municipality boundary used for region selection on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Municipality {
    /// Municipality name (the `NM_MUN` property of the boundaries file).
    pub name: String,
    /// Boundary polygon.
    pub geometry: MultiPolygon<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_risk(2.5), 3);
        assert_eq!(round_risk(3.5), 4);
        assert_eq!(round_risk(-2.5), -3);
    }

    #[test]
    fn rounds_to_nearest_when_not_at_half() {
        assert_eq!(round_risk(2.4), 2);
        assert_eq!(round_risk(2.6), 3);
        assert_eq!(round_risk(0.0), 0);
    }

    #[test]
    fn from_mean_derives_rounded_bucket() {
        let risk = CellRisk::from_mean(4.0);
        assert!((risk.risk_mean - 4.0).abs() < f64::EPSILON);
        assert_eq!(risk.risk_mean_rounded, 4);
    }

    #[test]
    fn zero_score_has_zero_fields() {
        assert!(CellRisk::ZERO.risk_mean.abs() < f64::EPSILON);
        assert_eq!(CellRisk::ZERO.risk_mean_rounded, 0);
    }

    #[test]
    fn fresh_status_reports_fresh() {
        assert!(AggregateStatus::Fresh.is_fresh());
        assert!(!AggregateStatus::NeedsComputation.is_fresh());
    }
}
