#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the roadrisk dashboard server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the domain types so the API contract can evolve independently of
//! the aggregation pipeline.

use roadrisk_map_analytics_models::{BucketShare, bucket_color};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is up and its data loaded.
    pub healthy: bool,
    /// Server crate version.
    pub version: String,
}

/// One bucket's slice of the per-municipality distribution, with its
/// display color so the chart matches the choropleth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBucketShare {
    /// Rounded risk bucket.
    pub bucket: i64,
    /// Display color for this bucket.
    pub color: String,
    /// Number of selected cells in this bucket.
    pub count: u64,
    /// Percentage share of the selected cells (0-100).
    pub percent: f64,
}

impl From<BucketShare> for ApiBucketShare {
    fn from(share: BucketShare) -> Self {
        Self {
            bucket: share.bucket,
            color: bucket_color(share.bucket).to_string(),
            count: share.count,
            percent: share.percent,
        }
    }
}

/// Risk distribution for a selected municipality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistribution {
    /// Municipality the distribution was computed for.
    pub municipality: String,
    /// Bucket shares, sorted by bucket.
    pub buckets: Vec<ApiBucketShare>,
}

/// One stop of the fixed ordinal color scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiColorStop {
    /// Rounded risk bucket.
    pub bucket: i64,
    /// Display color for this bucket.
    pub color: String,
}

/// Query parameters for the distribution endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionQueryParams {
    /// Municipality name as listed by `/api/municipalities`.
    pub municipality: String,
}
