use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use fleetscan_model::{CredentialStatus, CredentialType};
use serde::Deserialize;
use std::str::FromStr;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/credentials", get(list).post(create))
        .route("/api/credentials/:id", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    include_expired: bool,
}

async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    let credentials = state.vault.list().await?;
    let filtered: Vec<_> = credentials
        .into_iter()
        .filter(|c| query.include_expired || c.status != CredentialStatus::Expired)
        .collect();
    Ok(Json(serde_json::json!({ "success": true, "credentials": filtered })))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    name: String,
    username: String,
    #[serde(rename = "type")]
    credential_type: String,
    password: String,
    valid_until: Option<NaiveDate>,
}

async fn create(State(state): State<AppState>, Json(body): Json<CreateRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    if body.name.is_empty() || body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation("name, username, and password are required".to_string()));
    }
    let credential_type = CredentialType::from_str(&body.credential_type)
        .map_err(ApiError::Validation)?;

    let created = state
        .vault
        .create(&body.name, &body.username, credential_type, &body.password, body.valid_until)
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "credential": created })))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    valid_until: Option<Option<NaiveDate>>,
    is_active: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .vault
        .update(id, body.username, body.password, body.valid_until, body.is_active)
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "credential": updated })))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<serde_json::Value>, ApiError> {
    state.vault.delete(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
