use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cache/stats", get(stats))
        .route("/api/cache/clear", post(clear))
}

async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "stats": state.cache.stats() }))
}

#[derive(Debug, Deserialize, Default)]
struct ClearRequest {
    namespace: Option<String>,
}

async fn clear(State(state): State<AppState>, body: Option<Json<ClearRequest>>) -> Json<serde_json::Value> {
    let namespace = body.and_then(|Json(b)| b.namespace);
    match namespace {
        Some(ns) => state.cache.clear_namespace(&ns),
        None => state.cache.clear_all(),
    }
    Json(serde_json::json!({ "success": true }))
}
