use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use fleetscan_model::{LogicalOperation, RepositoryId};
use fleetscan_query::GitActionRequest;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ansible-inventory/preview", post(preview))
        .route("/api/ansible-inventory/generate", post(generate))
        .route("/api/ansible-inventory/download", post(download))
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    operations: Vec<LogicalOperation>,
}

async fn preview(State(state): State<AppState>, Json(body): Json<PreviewRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = fleetscan_query::evaluate(&state.sms, &body.operations)
        .await
        .map_err(|e| ApiError::RemoteUnavailable(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "devices": outcome.devices,
        "total_count": outcome.devices.len(),
        "operations_executed": outcome.operations_executed,
    })))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    operations: Vec<LogicalOperation>,
    template_name: String,
    template_category: String,
    git_repository_id: Option<RepositoryId>,
    destination_filename: Option<String>,
    #[serde(default)]
    auto_commit: bool,
    #[serde(default)]
    auto_push: bool,
    commit_message: Option<String>,
}

async fn render(state: &AppState, body: &GenerateRequest) -> Result<(String, Option<String>), ApiError> {
    let outcome = fleetscan_query::evaluate(&state.sms, &body.operations)
        .await
        .map_err(|e| ApiError::RemoteUnavailable(e.to_string()))?;

    let template = state
        .templates
        .get_by_name_category(&body.template_name, &body.template_category)
        .ok_or_else(|| ApiError::NotFound(format!("template {}/{}", body.template_category, body.template_name)))?;

    let repo = body.git_repository_id.and_then(|id| state.repositories.get(id));
    let filename = body
        .destination_filename
        .clone()
        .unwrap_or_else(|| format!("{}.yaml", body.template_name));

    let destination_root = match &repo {
        Some(repo) => state.git.repo_path(repo),
        None => state.config.inventory_fallback_root(),
    };
    let git = repo.as_ref().map(|repo| {
        (
            state.git.as_ref(),
            GitActionRequest {
                repo,
                auto_commit: body.auto_commit,
                auto_push: body.auto_push,
                commit_message: body.commit_message.as_deref(),
            },
        )
    });

    let render_outcome = fleetscan_query::inventory::render_and_write(
        &template.content,
        &outcome.devices,
        destination_root.as_path(),
        &filename,
        git,
    )
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let rendered = tokio::fs::read_to_string(&render_outcome.path)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((rendered, Some(render_outcome.path.display().to_string())))
}

async fn generate(State(state): State<AppState>, Json(body): Json<GenerateRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let (rendered, path) = render(&state, &body).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "content": rendered,
        "path": path,
    })))
}

async fn download(State(state): State<AppState>, Json(body): Json<GenerateRequest>) -> Result<impl IntoResponse, ApiError> {
    let (rendered, _path) = render(&state, &body).await?;
    let filename = body
        .destination_filename
        .clone()
        .unwrap_or_else(|| format!("{}.yaml", body.template_name));

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-yaml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        rendered,
    ))
}
