mod cache;
mod credentials;
mod git_repositories;
mod inventory;
mod scan;

use crate::auth::require_bearer_token;
use crate::state::AppState;
use axum::routing::get;
use axum::{middleware, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build(state: AppState) -> Router {
    let authenticated = Router::new()
        .merge(credentials::router())
        .merge(git_repositories::router())
        .merge(scan::router())
        .merge(inventory::router())
        .merge(cache::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
