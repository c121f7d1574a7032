// src/api.rs
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::scrape::aggregate::{Aggregator, RunRequest};
use crate::scrape::types::{AggregateReport, Source};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/api/updates",
            get(updates)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/api/sources", get(list_sources))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatesQuery {
    #[serde(default)]
    pub category: Option<String>,
    /// `1`/`true` attaches per-source debug info.
    #[serde(default)]
    pub debug: Option<String>,
}

impl UpdatesQuery {
    fn to_request(&self) -> RunRequest {
        let debug = self
            .debug
            .as_deref()
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        RunRequest { category, debug }
    }
}

async fn updates(
    State(state): State<AppState>,
    Query(q): Query<UpdatesQuery>,
) -> Json<AggregateReport> {
    let req = q.to_request();
    tracing::info!(target: "api", category = ?req.category, debug = req.debug, "GET /api/updates");
    Json(state.aggregator.run_with(&req).await)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

#[derive(Serialize)]
struct SourcesResp {
    sources: Vec<Source>,
    categories: Vec<String>,
}

async fn list_sources(State(state): State<AppState>) -> Json<SourcesResp> {
    Json(SourcesResp {
        sources: state.aggregator.sources().to_vec(),
        categories: state.aggregator.categories(),
    })
}
