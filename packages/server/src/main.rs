#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Actix-Web API server for the roadrisk dashboard.
//!
//! Serves the aggregated risk grid, municipality boundaries, urban area
//! overlay, and per-municipality risk distributions to the map frontend.
//! All data is loaded once at startup from the generated snapshot and
//! held read-only in shared state; run the generate tool first.

mod handlers;

use std::path::{Path, PathBuf};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use roadrisk_map_grid_models::{GridCell, Municipality};

/// Shared application state, loaded once at startup.
pub struct AppState {
    /// Aggregated grid cells from the snapshot.
    pub cells: Vec<GridCell>,
    /// The snapshot body as serialized GeoJSON, served verbatim.
    pub cells_geojson: String,
    /// Municipality boundaries for region selection.
    pub municipalities: Vec<Municipality>,
    /// Urban area overlay as serialized GeoJSON, served verbatim.
    pub urban_areas_geojson: String,
}

/// Loads all dashboard data from the data directory.
///
/// Fails when the aggregated snapshot is absent rather than serving an
/// empty grid; the generate tool owns producing it.
fn load_state(data_dir: &Path) -> Result<AppState, Box<dyn std::error::Error>> {
    let grid_path = data_dir.join(roadrisk_map_geodata::GRID_FILE);
    let store = roadrisk_map_geodata::store_path(&grid_path);
    if !store.exists() {
        return Err(format!(
            "Aggregated snapshot {} not found; run roadrisk_map_generate aggregate first",
            store.display()
        )
        .into());
    }

    let cells = roadrisk_map_geodata::load_cells(&store)?;
    let cells_geojson = std::fs::read_to_string(&store)?;

    let municipalities = roadrisk_map_geodata::load_municipalities(
        &data_dir.join(roadrisk_map_geodata::MUNICIPALITIES_FILE),
    )?;

    let urban_areas_geojson = roadrisk_map_geodata::load_feature_collection(
        &data_dir.join(roadrisk_map_geodata::URBAN_AREAS_FILE),
    )?
    .to_string();

    Ok(AppState {
        cells,
        cells_geojson,
        municipalities,
        urban_areas_geojson,
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    log::info!("Loading dashboard data from {}", data_dir.display());

    let state = web::Data::new(load_state(&data_dir).expect("Failed to load dashboard data"));
    log::info!(
        "Serving {} cells and {} municipality boundaries",
        state.cells.len(),
        state.municipalities.len()
    );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/municipalities", web::get().to(handlers::municipalities))
                    .route("/cells", web::get().to(handlers::cells))
                    .route("/urban-areas", web::get().to(handlers::urban_areas))
                    .route("/distribution", web::get().to(handlers::distribution))
                    .route("/color-scale", web::get().to(handlers::color_scale)),
            )
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
