//! JSON HTTP API for the discovery engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/search?q=…` | Relevance-ranked store search (JSON array with scores) |
//! | `GET`  | `/api/stores/near?lng=…&lat=…` | Proximity search, map projection |
//! | `GET`  | `/api/tags` | All tagged stores plus the distinct tag list |
//! | `GET`  | `/api/tags/{tag}` | Stores carrying a tag, plus the distinct tag list |
//! | `GET`  | `/store/{slug}` | Single store by slug |
//! | `GET`  | `/uploads/{file}` | Ingested media assets, served statically |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_query", "message": "query must not be empty" } }
//! ```
//!
//! Codes map the error taxonomy: `invalid_query` / `invalid_coordinates`
//! (400), `unsupported_media_type` (415), `not_found` (404),
//! `ownership_violation` (403), `validation` (422), `decode` (400),
//! `write` / `repository` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! map clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::discovery;
use crate::error::StoreError;
use crate::records;
use crate::store::{sqlite::SqliteRepository, StoreRepository};
use crate::{db, migrate};

/// Shared application state: configuration plus the injected repository
/// handle. No ambient lookups — handlers only see what is passed here.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    repo: Arc<dyn StoreRepository>,
}

/// Starts the HTTP server against the configured SQLite database. Runs the
/// schema migrations first so a fresh database works out of the box.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    migrate::run_migrations(config).await?;
    let pool = db::connect(&config.db).await?;
    let repo: Arc<dyn StoreRepository> = Arc::new(SqliteRepository::new(pool));
    run_server_with_repository(config, repo).await
}

/// Like [`run_server`], but with an injected repository — used by tests and
/// custom binaries.
pub async fn run_server_with_repository(
    config: &Config,
    repo: Arc<dyn StoreRepository>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        repo,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/search", get(handle_search))
        .route("/api/stores/near", get(handle_near))
        .route("/api/tags", get(handle_tags_index))
        .route("/api/tags/{tag}", get(handle_tag))
        .route("/store/{slug}", get(handle_store))
        .route("/health", get(handle_health))
        .nest_service("/uploads", ServeDir::new(&state.config.media.upload_root))
        .layer(cors)
        .with_state(state);

    println!("storemap API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Wrapper mapping the typed error taxonomy onto HTTP responses.
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            StoreError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            StoreError::InvalidCoordinates(_) => (StatusCode::BAD_REQUEST, "invalid_coordinates"),
            StoreError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            StoreError::Decode(_) => (StatusCode::BAD_REQUEST, "decode"),
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::OwnershipViolation => (StatusCode::FORBIDDEN, "ownership_violation"),
            StoreError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            StoreError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "write"),
            StoreError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let hits = discovery::search_stores(
        state.repo.as_ref(),
        &params.q,
        state.config.discovery.search_limit,
    )
    .await?;
    Ok(Json(serde_json::json!(hits)))
}

// ============ GET /api/stores/near ============

/// Coordinates arrive as raw strings; parsing (and the finite-number check)
/// belongs to the discovery engine.
#[derive(Deserialize)]
struct NearParams {
    #[serde(default)]
    lng: String,
    #[serde(default)]
    lat: String,
}

async fn handle_near(
    State(state): State<AppState>,
    Query(params): Query<NearParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stores = discovery::map_stores(
        state.repo.as_ref(),
        &params.lng,
        &params.lat,
        state.config.discovery.near_max_distance_m,
        state.config.discovery.near_limit,
    )
    .await?;
    Ok(Json(serde_json::json!(stores)))
}

// ============ GET /api/tags, /api/tags/{tag} ============

async fn handle_tags_index(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = discovery::stores_by_tag(state.repo.as_ref(), None).await?;
    Ok(Json(serde_json::json!(page)))
}

async fn handle_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = discovery::stores_by_tag(state.repo.as_ref(), Some(&tag)).await?;
    Ok(Json(serde_json::json!(page)))
}

// ============ GET /store/{slug} ============

async fn handle_store(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = records::get_store_by_slug(state.repo.as_ref(), &slug).await?;
    Ok(Json(serde_json::json!(store)))
}
