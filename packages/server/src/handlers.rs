//! HTTP handler functions for the roadrisk dashboard API.

use actix_web::{HttpResponse, web};
use geo::{MultiPolygon, Polygon};
use roadrisk_map_analytics::risk_distribution;
use roadrisk_map_analytics_models::{MAX_COLORED_BUCKET, bucket_color};
use roadrisk_map_server_models::{
    ApiBucketShare, ApiColorStop, ApiDistribution, ApiHealth, DistributionQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/municipalities`
///
/// Returns the sorted, deduplicated municipality names for the region
/// selector.
pub async fn municipalities(state: web::Data<AppState>) -> HttpResponse {
    let mut names: Vec<&str> = state
        .municipalities
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();

    HttpResponse::Ok().json(names)
}

/// `GET /api/cells`
///
/// Returns the aggregated grid snapshot verbatim; the frontend colors
/// each cell by its `risk_mean_rounded` property.
pub async fn cells(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(state.cells_geojson.clone())
}

/// `GET /api/urban-areas`
///
/// Returns the urban area overlay verbatim.
pub async fn urban_areas(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(state.urban_areas_geojson.clone())
}

/// `GET /api/distribution?municipality=NAME`
///
/// Computes the risk bucket distribution over the cells intersecting the
/// named municipality. A name can map to several boundary features; their
/// polygons are combined so the selection behaves like a union.
pub async fn distribution(
    state: web::Data<AppState>,
    params: web::Query<DistributionQueryParams>,
) -> HttpResponse {
    let polygons: Vec<Polygon<f64>> = state
        .municipalities
        .iter()
        .filter(|m| m.name == params.municipality)
        .flat_map(|m| m.geometry.0.iter().cloned())
        .collect();

    if polygons.is_empty() {
        return HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Unknown municipality: {}", params.municipality)
        }));
    }

    let region = MultiPolygon::new(polygons);
    let buckets: Vec<ApiBucketShare> = risk_distribution(&state.cells, &region)
        .into_iter()
        .map(ApiBucketShare::from)
        .collect();

    HttpResponse::Ok().json(ApiDistribution {
        municipality: params.municipality.clone(),
        buckets,
    })
}

/// `GET /api/color-scale`
///
/// Returns the fixed ordinal bucket color scale so the choropleth and the
/// distribution chart stay consistent.
pub async fn color_scale() -> HttpResponse {
    let stops: Vec<ApiColorStop> = (0..=MAX_COLORED_BUCKET)
        .map(|bucket| ApiColorStop {
            bucket,
            color: bucket_color(bucket).to_string(),
        })
        .collect();

    HttpResponse::Ok().json(stops)
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use geo::LineString;
    use roadrisk_map_grid_models::{CellRisk, GridCell, Municipality};

    use super::*;

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

    fn scored_cell(identity: &str, min_x: f64, rounded: i64) -> GridCell {
        #[allow(clippy::cast_precision_loss)]
        let risk_mean = rounded as f64;
        GridCell {
            identity: identity.to_string(),
            geometry: unit_cell(min_x, 0.0),
            risk: Some(CellRisk {
                risk_mean,
                risk_mean_rounded: rounded,
            }),
        }
    }

    fn test_state() -> web::Data<AppState> {
        let cells = vec![
            scored_cell("a", 0.0, 0),
            scored_cell("b", 2.0, 2),
            scored_cell("c", 50.0, 5),
        ];
        let municipalities = vec![
            Municipality {
                name: "Campinas".to_string(),
                geometry: unit_cell(0.0, 0.0),
            },
            Municipality {
                name: "Campinas".to_string(),
                geometry: unit_cell(2.0, 0.0),
            },
            Municipality {
                name: "Santos".to_string(),
                geometry: unit_cell(50.0, 0.0),
            },
        ];

        web::Data::new(AppState {
            cells,
            cells_geojson: r#"{"type":"FeatureCollection","features":[]}"#.to_string(),
            municipalities,
            urban_areas_geojson: r#"{"type":"FeatureCollection","features":[]}"#.to_string(),
        })
    }

    #[actix_web::test]
    async fn health_reports_healthy() {
        let app =
            test::init_service(App::new().route("/api/health", web::get().to(health))).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(body.healthy);
    }

    #[actix_web::test]
    async fn municipalities_are_sorted_and_deduplicated() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .route("/api/municipalities", web::get().to(municipalities)),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/municipalities").to_request();
        let names: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(names, ["Campinas", "Santos"]);
    }

    #[actix_web::test]
    async fn distribution_unions_same_name_boundaries() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .route("/api/distribution", web::get().to(distribution)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/distribution?municipality=Campinas")
            .to_request();
        let body: ApiDistribution = test::call_and_read_body_json(&app, req).await;

        // Cells "a" and "b" sit under the two Campinas boundary features.
        assert_eq!(body.buckets.len(), 2);
        assert_eq!(body.buckets[0].bucket, 0);
        assert!((body.buckets[0].percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(body.buckets[1].bucket, 2);
        assert_eq!(body.buckets[1].color, "#FFFF00");
    }

    #[actix_web::test]
    async fn unknown_municipality_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .route("/api/distribution", web::get().to(distribution)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/distribution?municipality=Nowhere")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn color_scale_covers_all_buckets() {
        let app = test::init_service(
            App::new().route("/api/color-scale", web::get().to(color_scale)),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/color-scale").to_request();
        let stops: Vec<ApiColorStop> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stops.len(), 7);
        assert_eq!(stops[0].color, "#00FF00");
        assert_eq!(stops[6].color, "#FF0000");
    }
}
