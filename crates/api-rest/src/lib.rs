//! # API REST
//!
//! REST API for the URC surveillance engine.
//!
//! Handles:
//! - HTTP endpoints with axum, one per service operation
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON shapes, status codes, CORS)
//!
//! Validation errors map to `400`, unknown ids to `404`. A transition whose collections could
//! not be saved still answers `200`, with the failure in the body's `save_error` field.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use urc_core::{FileStore, SurveillanceService};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by all handlers.
///
/// The service owns one working set; the mutex serialises every operation against it.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<SurveillanceService<FileStore>>>,
}

impl AppState {
    pub fn new(service: SurveillanceService<FileStore>) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_organisms,
        handlers::organisms_by_tier,
        handlers::list_origins,
        handlers::add_organism,
        handlers::edit_organism,
        handlers::delete_organism,
        handlers::match_organism,
        handlers::list_thresholds,
        handlers::set_threshold,
        handlers::reset_thresholds,
        handlers::list_measures,
        handlers::measures_by_scope,
        handlers::add_measure,
        handlers::edit_measure,
        handlers::delete_measure,
        handlers::select_measures,
        handlers::list_points,
        handlers::add_point,
        handlers::list_samples,
        handlers::collect_sample,
        handlers::archive_sample,
        handlers::due_readings,
        handlers::resolve_reading,
        handlers::list_identifications,
        handlers::identify,
        handlers::reopen_identification,
        handlers::discard_identification,
        handlers::list_ledger,
        handlers::ledger_stats,
        handlers::delete_record,
        handlers::clear_ledger,
    ),
    components(schemas(
        error::ErrorRes,
        dto::HealthRes,
        dto::OrganismDto,
        dto::OrganismReq,
        dto::OrganismListRes,
        dto::OrganismTierGroup,
        dto::OrganismsByTierRes,
        dto::OriginsRes,
        dto::OrganismRes,
        dto::MatchReq,
        dto::MatchRes,
        dto::ThresholdDto,
        dto::ThresholdListRes,
        dto::ThresholdReq,
        dto::ThresholdRes,
        dto::ThresholdResetRes,
        dto::MeasureDto,
        dto::MeasureReq,
        dto::MeasureListRes,
        dto::MeasureGroup,
        dto::MeasureGroupsRes,
        dto::MeasureRes,
        dto::SelectReq,
        dto::ChecklistDto,
        dto::PointDto,
        dto::PointListRes,
        dto::PointRes,
        dto::SampleDto,
        dto::ReadingDto,
        dto::CollectReq,
        dto::CollectRes,
        dto::SampleListRes,
        dto::SampleRes,
        dto::DueReadingDto,
        dto::DueListRes,
        dto::ResolveReq,
        dto::ResolveRes,
        dto::IdentificationDto,
        dto::IdentificationListRes,
        dto::IdentifyReq,
        dto::IdentifyRes,
        dto::ReopenRes,
        dto::DiscardRes,
        dto::LedgerRecordDto,
        dto::LedgerListRes,
        dto::LedgerStatsRes,
        dto::DeleteRecordRes,
        dto::ClearLedgerRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/organisms",
            get(handlers::list_organisms).post(handlers::add_organism),
        )
        .route("/organisms/by-tier", get(handlers::organisms_by_tier))
        .route("/organisms/origins", get(handlers::list_origins))
        .route(
            "/organisms/:name",
            put(handlers::edit_organism).delete(handlers::delete_organism),
        )
        .route("/match", post(handlers::match_organism))
        .route("/thresholds", get(handlers::list_thresholds))
        .route("/thresholds/reset", post(handlers::reset_thresholds))
        .route("/thresholds/:tier", put(handlers::set_threshold))
        .route(
            "/measures",
            get(handlers::list_measures).post(handlers::add_measure),
        )
        .route("/measures/by-scope", get(handlers::measures_by_scope))
        .route("/measures/select", post(handlers::select_measures))
        .route(
            "/measures/:id",
            put(handlers::edit_measure).delete(handlers::delete_measure),
        )
        .route("/points", get(handlers::list_points).post(handlers::add_point))
        .route(
            "/samples",
            get(handlers::list_samples).post(handlers::collect_sample),
        )
        .route("/samples/:id/archive", post(handlers::archive_sample))
        .route("/readings/due", get(handlers::due_readings))
        .route("/readings/:id/resolve", post(handlers::resolve_reading))
        .route("/identifications", get(handlers::list_identifications))
        .route("/identifications/:id/identify", post(handlers::identify))
        .route(
            "/identifications/:id/reopen",
            post(handlers::reopen_identification),
        )
        .route(
            "/identifications/:id",
            delete(handlers::discard_identification),
        )
        .route(
            "/ledger",
            get(handlers::list_ledger).delete(handlers::clear_ledger),
        )
        .route("/ledger/stats", get(handlers::ledger_stats))
        .route("/ledger/:id", delete(handlers::delete_record))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use urc_core::CoreConfig;

    fn app(temp_dir: &TempDir) -> Router {
        let cfg = Arc::new(
            CoreConfig::with_data_dir(temp_dir.path().to_path_buf()).expect("config"),
        );
        let service = SurveillanceService::open_data_dir(cfg).expect("open service");
        router(AppState::new(service))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (status, body) = send(&app(&temp_dir), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_match_abbreviated_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (status, body) = send(
            &app(&temp_dir),
            "POST",
            "/match",
            Some(json!({ "query": "E.coli" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidate"], "Escherichia coli");
        assert_eq!(body["confidence"], "45%");
        assert_eq!(body["accepted"], true);
    }

    #[tokio::test]
    async fn test_full_workflow_over_http() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let app = app(&temp_dir);

        let (status, _) = send(
            &app,
            "POST",
            "/points",
            Some(json!({ "label": "Isolateur 1", "sample_type": "air" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, collected) = send(
            &app,
            "POST",
            "/samples",
            Some(json!({
                "point_label": "Isolateur 1",
                "operator": "Marie",
                "collection_date": "2026-03-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collected["save_error"], Value::Null);
        let j2 = collected["readings"][0]["id"].as_str().expect("J2 id").to_string();

        let (_, due) = send(&app, "GET", "/readings/due?today=2026-03-04", None).await;
        assert_eq!(due["readings"].as_array().expect("array").len(), 1);

        let (status, resolved) = send(
            &app,
            "POST",
            &format!("/readings/{j2}/resolve"),
            Some(json!({ "colony_count": 30, "today": "2026-03-04" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resolved["outcome"], "positive");
        let ident = resolved["identification"]["id"]
            .as_str()
            .expect("identification id")
            .to_string();

        let (status, identified) = send(
            &app,
            "POST",
            &format!("/identifications/{ident}/identify"),
            Some(json!({ "organism": "E.coli" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(identified["resolved"], true);
        assert_eq!(identified["record"]["status"], "action");
        assert_eq!(identified["checklist"]["outcome"], "measures");

        let (_, stats) = send(&app, "GET", "/ledger/stats", None).await;
        assert_eq!(stats["actions"], 1);
        assert_eq!(stats["total"], 1);
    }

    #[tokio::test]
    async fn test_status_codes_for_bad_and_unknown_input() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let app = app(&temp_dir);

        let (status, _) = send(
            &app,
            "PUT",
            "/thresholds/9",
            Some(json!({ "alert_count": 1, "action_count": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = urc_records::RecordId::new();
        let (status, body) = send(
            &app,
            "POST",
            &format!("/readings/{unknown}/resolve"),
            Some(json!({ "colony_count": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().expect("error").contains("reading"));

        let (status, _) = send(&app, "DELETE", "/ledger/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inverted_threshold_is_accepted_with_warning() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (status, body) = send(
            &app(&temp_dir),
            "PUT",
            "/thresholds/3",
            Some(json!({ "alert_count": 50, "action_count": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["warning"].is_string());
        assert_eq!(body["profile"]["action_count"], 30);
    }
}
