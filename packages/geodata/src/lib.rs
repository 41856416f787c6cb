#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! GeoJSON loading and snapshot persistence for the risk grid pipeline.
//!
//! Loads the four input FeatureCollections (road segments, hex grid,
//! urban areas, municipality boundaries) into typed domain collections,
//! and reads/writes the aggregated-grid snapshot that memoizes the risk
//! computation across runs.
//!
//! Degenerate inputs (empty geometries, non-finite risk values, missing
//! identities) fail the whole load rather than being skipped: a silently
//! dropped segment would deflate the means of every cell it touches, and a
//! dropped cell would leave a hole in the aggregated collection.

pub mod progress;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use geo::{MultiLineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use roadrisk_map_grid_models::{CellRisk, GridCell, Municipality, RoadSegment};
use thiserror::Error;

/// Road segment input file (line geometries with the `KmP` risk property).
pub const SEGMENTS_FILE: &str = "Risco.geojson";

/// Hexagonal grid input file.
pub const GRID_FILE: &str = "H3.geojson";

/// Urban area overlay file, served by the dashboard untouched.
pub const URBAN_AREAS_FILE: &str = "AU.geojson";

/// Municipality boundaries file.
pub const MUNICIPALITIES_FILE: &str = "MUN_SP.geojson";

/// Archive the municipality boundaries ship in.
pub const MUNICIPALITIES_ARCHIVE: &str = "MUN_SP.zip";

/// Property carrying the measured risk value on segment features
/// (incidents per km).
pub const RISK_PROPERTY: &str = "KmP";

/// Property carrying the stable cell key on grid features.
pub const IDENTITY_PROPERTY: &str = "index";

/// Derived property: arithmetic mean of intersecting segment risks.
pub const RISK_MEAN_PROPERTY: &str = "risk_mean";

/// Derived property: `risk_mean` rounded to its integer bucket.
pub const RISK_MEAN_ROUNDED_PROPERTY: &str = "risk_mean_rounded";

/// Property carrying the municipality name on boundary features.
pub const MUNICIPALITY_NAME_PROPERTY: &str = "NM_MUN";

/// Errors that can occur while loading or persisting geodata.
#[derive(Debug, Error)]
pub enum GeodataError {
    /// A required geometry source could not be located. Fatal; no
    /// computation is performed.
    #[error("Missing input file: {path}")]
    MissingInput {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The file is not valid GeoJSON.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying GeoJSON error.
        #[source]
        source: geojson::Error,
    },

    /// A record's geometry is degenerate or of an unexpected type.
    #[error("Invalid geometry in {path}: {detail}")]
    InvalidGeometry {
        /// File being parsed.
        path: PathBuf,
        /// Which feature and what was wrong with it.
        detail: String,
    },

    /// A record's attribute is missing or unusable.
    #[error("Invalid property in {path}: {detail}")]
    InvalidProperty {
        /// File being parsed.
        path: PathBuf,
        /// Which feature and what was wrong with it.
        detail: String,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads the road segment collection from a GeoJSON file.
///
/// Features must carry `LineString` or `MultiLineString` geometry and a
/// finite numeric [`RISK_PROPERTY`].
///
/// # Errors
///
/// Returns [`GeodataError::MissingInput`] if the file does not exist,
/// [`GeodataError::InvalidGeometry`] / [`GeodataError::InvalidProperty`]
/// for degenerate records, and parse/IO errors otherwise.
pub fn load_segments(path: &Path) -> Result<Vec<RoadSegment>, GeodataError> {
    let collection = read_feature_collection(path)?;

    let mut segments = Vec::with_capacity(collection.features.len());
    for (position, feature) in collection.features.iter().enumerate() {
        let geometry = match feature_geometry(path, feature, position)? {
            geo::Geometry::LineString(line) => MultiLineString::new(vec![line]),
            geo::Geometry::MultiLineString(lines) => lines,
            other => {
                return Err(GeodataError::InvalidGeometry {
                    path: path.to_path_buf(),
                    detail: format!(
                        "feature {position}: expected line geometry, got {}",
                        geometry_kind(&other)
                    ),
                });
            }
        };

        if geometry.0.is_empty() || geometry.0.iter().any(|line| line.0.len() < 2) {
            return Err(GeodataError::InvalidGeometry {
                path: path.to_path_buf(),
                detail: format!("feature {position}: empty or degenerate line geometry"),
            });
        }

        let risk_value = finite_number_property(path, feature, RISK_PROPERTY, position)?;

        segments.push(RoadSegment {
            geometry,
            risk_value,
        });
    }

    log::info!("Loaded {} road segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Loads a grid cell collection from a GeoJSON file.
///
/// Works for both the raw grid and the aggregated snapshot: the derived
/// `risk_mean` / `risk_mean_rounded` properties are picked up when both
/// are present and left `None` when both are absent. A feature carrying
/// only one of the two is rejected as an inconsistent snapshot.
///
/// # Errors
///
/// Returns [`GeodataError::MissingInput`] if the file does not exist,
/// [`GeodataError::InvalidGeometry`] / [`GeodataError::InvalidProperty`]
/// for degenerate records or duplicate identities, and parse/IO errors
/// otherwise.
pub fn load_cells(path: &Path) -> Result<Vec<GridCell>, GeodataError> {
    let collection = read_feature_collection(path)?;

    let mut seen = BTreeSet::new();
    let mut cells = Vec::with_capacity(collection.features.len());
    for (position, feature) in collection.features.iter().enumerate() {
        let geometry = polygonal_geometry(path, feature, position)?;

        let identity = identity_property(path, feature, position)?;
        if !seen.insert(identity.clone()) {
            return Err(GeodataError::InvalidProperty {
                path: path.to_path_buf(),
                detail: format!("feature {position}: duplicate cell identity '{identity}'"),
            });
        }

        let risk = derived_risk(path, feature, position)?;

        cells.push(GridCell {
            identity,
            geometry,
            risk,
        });
    }

    log::info!("Loaded {} grid cells from {}", cells.len(), path.display());
    Ok(cells)
}

/// Loads municipality boundaries from a GeoJSON file.
///
/// # Errors
///
/// Returns [`GeodataError::MissingInput`] if the file does not exist,
/// [`GeodataError::InvalidGeometry`] / [`GeodataError::InvalidProperty`]
/// for degenerate records, and parse/IO errors otherwise.
pub fn load_municipalities(path: &Path) -> Result<Vec<Municipality>, GeodataError> {
    let collection = read_feature_collection(path)?;

    let mut municipalities = Vec::with_capacity(collection.features.len());
    for (position, feature) in collection.features.iter().enumerate() {
        let geometry = polygonal_geometry(path, feature, position)?;

        let name = feature
            .property(MUNICIPALITY_NAME_PROPERTY)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| GeodataError::InvalidProperty {
                path: path.to_path_buf(),
                detail: format!(
                    "feature {position}: missing '{MUNICIPALITY_NAME_PROPERTY}' name property"
                ),
            })?
            .to_string();

        municipalities.push(Municipality { name, geometry });
    }

    log::info!(
        "Loaded {} municipality boundaries from {}",
        municipalities.len(),
        path.display()
    );
    Ok(municipalities)
}

/// Loads a GeoJSON FeatureCollection without typing its features.
///
/// Used for pass-through overlays (urban areas) that the dashboard serves
/// untouched; parsing up front surfaces malformed files at startup instead
/// of at first request.
///
/// # Errors
///
/// Returns [`GeodataError::MissingInput`] if the file does not exist, and
/// parse/IO errors otherwise.
pub fn load_feature_collection(path: &Path) -> Result<FeatureCollection, GeodataError> {
    let collection = read_feature_collection(path)?;
    log::info!(
        "Loaded {} features from {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection)
}

/// Returns the snapshot store path for a grid input path.
///
/// The snapshot sits beside the grid file with a `_with_risk` suffix,
/// e.g. `H3.geojson` -> `H3_with_risk.geojson`. The store is keyed by the
/// grid definition this way; it is never expired or invalidated
/// automatically.
#[must_use]
pub fn store_path(grid_path: &Path) -> PathBuf {
    let stem = grid_path
        .file_stem()
        .map_or_else(|| "grid".to_string(), |s| s.to_string_lossy().to_string());
    grid_path.with_file_name(format!("{stem}_with_risk.geojson"))
}

/// Persists the aggregated cell collection as a GeoJSON snapshot.
///
/// Uses an atomic write pattern (write to `.tmp`, then rename) so an
/// interrupted run never leaves a truncated snapshot behind. Cell order is
/// preserved as given, so a deterministically sorted input produces a
/// byte-stable file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_cells(path: &Path, cells: &[GridCell]) -> Result<(), GeodataError> {
    let features: Vec<Feature> = cells
        .iter()
        .map(|cell| {
            let mut properties = geojson::JsonObject::new();
            properties.insert(
                IDENTITY_PROPERTY.to_string(),
                serde_json::Value::String(cell.identity.clone()),
            );
            if let Some(risk) = cell.risk {
                properties.insert(RISK_MEAN_PROPERTY.to_string(), risk.risk_mean.into());
                properties.insert(
                    RISK_MEAN_ROUNDED_PROPERTY.to_string(),
                    risk.risk_mean_rounded.into(),
                );
            }

            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&cell.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let tmp_path = path.with_extension("geojson.tmp");
    std::fs::write(&tmp_path, collection.to_string())?;
    std::fs::rename(&tmp_path, path)?;
    log::info!("Saved {} cells to {}", cells.len(), path.display());
    Ok(())
}

/// Reads and parses a file into a [`FeatureCollection`].
fn read_feature_collection(path: &Path) -> Result<FeatureCollection, GeodataError> {
    if !path.exists() {
        return Err(GeodataError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let geojson: GeoJson = contents.parse().map_err(|source| GeodataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    FeatureCollection::try_from(geojson).map_err(|source| GeodataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Converts a feature's geometry into a [`geo::Geometry`].
fn feature_geometry(
    path: &Path,
    feature: &Feature,
    position: usize,
) -> Result<geo::Geometry<f64>, GeodataError> {
    let Some(geometry) = &feature.geometry else {
        return Err(GeodataError::InvalidGeometry {
            path: path.to_path_buf(),
            detail: format!("feature {position} has no geometry"),
        });
    };

    geometry
        .clone()
        .try_into()
        .map_err(|e: geojson::Error| GeodataError::InvalidGeometry {
            path: path.to_path_buf(),
            detail: format!("feature {position}: {e}"),
        })
}

/// Converts a feature's geometry into a validated [`MultiPolygon`].
///
/// Accepts `Polygon` and `MultiPolygon`; rejects empty polygons and rings
/// with fewer than four coordinates (an unclosed or collapsed ring).
fn polygonal_geometry(
    path: &Path,
    feature: &Feature,
    position: usize,
) -> Result<MultiPolygon<f64>, GeodataError> {
    let geometry = match feature_geometry(path, feature, position)? {
        geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        geo::Geometry::MultiPolygon(polygons) => polygons,
        other => {
            return Err(GeodataError::InvalidGeometry {
                path: path.to_path_buf(),
                detail: format!(
                    "feature {position}: expected polygonal geometry, got {}",
                    geometry_kind(&other)
                ),
            });
        }
    };

    if geometry.0.is_empty()
        || geometry
            .0
            .iter()
            .any(|polygon| polygon.exterior().0.len() < 4)
    {
        return Err(GeodataError::InvalidGeometry {
            path: path.to_path_buf(),
            detail: format!("feature {position}: empty or degenerate polygon geometry"),
        });
    }

    Ok(geometry)
}

/// Reads the cell identity, accepting string or numeric values.
fn identity_property(
    path: &Path,
    feature: &Feature,
    position: usize,
) -> Result<String, GeodataError> {
    match feature.property(IDENTITY_PROPERTY) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GeodataError::InvalidProperty {
            path: path.to_path_buf(),
            detail: format!("feature {position}: missing '{IDENTITY_PROPERTY}' identity property"),
        }),
    }
}

/// Reads the derived risk properties if present.
///
/// Both properties present -> `Some(CellRisk)`; both absent -> `None`;
/// exactly one present -> inconsistent snapshot, rejected.
fn derived_risk(
    path: &Path,
    feature: &Feature,
    position: usize,
) -> Result<Option<CellRisk>, GeodataError> {
    let mean = feature.property(RISK_MEAN_PROPERTY);
    let rounded = feature.property(RISK_MEAN_ROUNDED_PROPERTY);

    match (mean, rounded) {
        (None, None) => Ok(None),
        (Some(_), Some(rounded_value)) => {
            let risk_mean = finite_number_property(path, feature, RISK_MEAN_PROPERTY, position)?;
            let risk_mean_rounded =
                rounded_value
                    .as_i64()
                    .ok_or_else(|| GeodataError::InvalidProperty {
                        path: path.to_path_buf(),
                        detail: format!(
                            "feature {position}: '{RISK_MEAN_ROUNDED_PROPERTY}' is not an integer"
                        ),
                    })?;
            Ok(Some(CellRisk {
                risk_mean,
                risk_mean_rounded,
            }))
        }
        _ => Err(GeodataError::InvalidProperty {
            path: path.to_path_buf(),
            detail: format!(
                "feature {position}: only one of '{RISK_MEAN_PROPERTY}' and \
                 '{RISK_MEAN_ROUNDED_PROPERTY}' is present"
            ),
        }),
    }
}

/// Reads a required finite numeric property.
fn finite_number_property(
    path: &Path,
    feature: &Feature,
    property: &str,
    position: usize,
) -> Result<f64, GeodataError> {
    let value = feature
        .property(property)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| GeodataError::InvalidProperty {
            path: path.to_path_buf(),
            detail: format!("feature {position}: missing numeric '{property}' property"),
        })?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeodataError::InvalidProperty {
            path: path.to_path_buf(),
            detail: format!("feature {position}: non-finite '{property}' value"),
        })
    }
}

/// Short geometry type name for error messages.
const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
