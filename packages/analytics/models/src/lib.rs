#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk distribution result types and the ordinal bucket color scale.
//!
//! The color scale is the dashboard's fixed green-to-red ramp over rounded
//! risk buckets; the choropleth and the per-municipality proportion chart
//! both key off it, so it lives here rather than in either consumer.

use serde::{Deserialize, Serialize};

/// Highest bucket with its own color; higher buckets clamp to its color.
pub const MAX_COLORED_BUCKET: i64 = 6;

/// One bucket's share of a selected cell population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketShare {
    /// Rounded risk bucket.
    pub bucket: i64,
    /// Number of selected cells in this bucket.
    pub count: u64,
    /// Percentage share of the selected cells (0-100).
    pub percent: f64,
}

/// Returns the display color for a rounded risk bucket.
///
/// Fixed ordinal ramp from green (no risk) to red (highest); buckets
/// outside the ramp clamp to its endpoints.
#[must_use]
pub const fn bucket_color(bucket: i64) -> &'static str {
    match bucket {
        i64::MIN..=0 => "#00FF00",
        1 => "#80FF00",
        2 => "#FFFF00",
        3 => "#FFBF00",
        4 => "#FF8000",
        5 => "#FF4000",
        _ => "#FF0000",
    }
}
