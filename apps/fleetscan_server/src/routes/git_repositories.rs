use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use fleetscan_model::{GitRepository, RepositoryCategory, RepositoryId};
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/git-repositories", get(list).post(create))
        .route("/api/git-repositories/selected", get(selected))
        .route("/api/git-repositories/test", post(test_connection))
        .route(
            "/api/git-repositories/:id",
            get(get_one).put(update).delete(remove),
        )
        .route("/api/git-repositories/selected/:id", post(select))
        .route("/api/git-repositories/:id/sync", post(sync))
        .route("/api/git-repositories/:id/status", get(status))
        .route("/api/git-repositories/:id/files/search", get(search_files))
}

async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "repositories": state.repositories.list() }))
}

fn find(state: &AppState, id: RepositoryId) -> Result<GitRepository, ApiError> {
    state
        .repositories
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("git repository {id}")))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<RepositoryId>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = find(&state, id)?;
    Ok(Json(serde_json::json!({ "success": true, "repository": repo })))
}

#[derive(Debug, Deserialize)]
struct RepoBody {
    name: String,
    category: RepositoryCategory,
    url: String,
    #[serde(default = "default_branch")]
    branch: String,
    username: Option<String>,
    token: Option<String>,
    credential_name: Option<String>,
    path: Option<String>,
    #[serde(default = "default_true")]
    verify_ssl: bool,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

async fn create(State(state): State<AppState>, Json(body): Json<RepoBody>) -> Result<Json<serde_json::Value>, ApiError> {
    if body.name.is_empty() || body.url.is_empty() {
        return Err(ApiError::Validation("name and url are required".to_string()));
    }
    let repo = GitRepository {
        id: 0,
        name: body.name,
        category: body.category,
        url: body.url,
        branch: body.branch,
        username: body.username,
        token: body.token,
        credential_name: body.credential_name,
        path: body.path,
        verify_ssl: body.verify_ssl,
        is_active: body.is_active,
        sync_status: None,
        last_sync: None,
    };
    let created = state.repositories.insert(repo);
    Ok(Json(serde_json::json!({ "success": true, "repository": created })))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    Json(body): Json<RepoBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = find(&state, id)?;
    let repo = GitRepository {
        id,
        name: body.name,
        category: body.category,
        url: body.url,
        branch: body.branch,
        username: body.username,
        token: body.token,
        credential_name: body.credential_name,
        path: body.path,
        verify_ssl: body.verify_ssl,
        is_active: body.is_active,
        sync_status: existing.sync_status,
        last_sync: existing.last_sync,
    };
    let updated = state
        .repositories
        .update(id, repo)
        .ok_or_else(|| ApiError::NotFound(format!("git repository {id}")))?;
    Ok(Json(serde_json::json!({ "success": true, "repository": updated })))
}

async fn remove(State(state): State<AppState>, Path(id): Path<RepositoryId>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.repositories.delete(id) {
        return Err(ApiError::NotFound(format!("git repository {id}")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn selected(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "repository": state.repositories.selected() }))
}

async fn select(State(state): State<AppState>, Path(id): Path<RepositoryId>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = find(&state, id)?;
    if repo.category != RepositoryCategory::Configs {
        return Err(ApiError::Validation(
            "only an active repository of category 'configs' may be selected".to_string(),
        ));
    }
    if !repo.is_active {
        return Err(ApiError::Validation("repository is not active".to_string()));
    }
    let selected = state
        .repositories
        .select(id)
        .ok_or_else(|| ApiError::NotFound(format!("git repository {id}")))?;
    Ok(Json(serde_json::json!({ "success": true, "repository": selected })))
}

#[derive(Debug, Deserialize)]
struct TestRequest {
    url: String,
    #[serde(default = "default_branch")]
    branch: String,
}

const TEST_CLONE_TIMEOUT: Duration = Duration::from_secs(30);

async fn test_connection(Json(body): Json<TestRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let dir = tempfile::tempdir().map_err(|e| ApiError::Internal(e.to_string()))?;
    let dest = dir.path().to_string_lossy().to_string();
    let outcome = timeout(
        TEST_CLONE_TIMEOUT,
        Command::new("git")
            .args([
                "clone",
                "--depth",
                "1",
                "--branch",
                body.branch.as_str(),
                body.url.as_str(),
                dest.as_str(),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output(),
    )
    .await;

    match outcome {
        Err(_) => Ok(Json(serde_json::json!({
            "success": false,
            "message": "connection test timed out after 30s",
            "details": null,
        }))),
        Ok(Err(e)) => Ok(Json(serde_json::json!({
            "success": false,
            "message": format!("failed to spawn git: {e}"),
            "details": null,
        }))),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Ok(Json(serde_json::json!({
                "success": output.status.success(),
                "message": if output.status.success() { "clone succeeded".to_string() } else { stderr.clone() },
                "details": stderr,
            })))
        }
    }
}

async fn sync(State(state): State<AppState>, Path(id): Path<RepositoryId>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = find(&state, id)?;
    let outcome = state.git.sync(&repo).await?;
    Ok(Json(serde_json::json!({ "success": true, "outcome": outcome })))
}

async fn status(State(state): State<AppState>, Path(id): Path<RepositoryId>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = find(&state, id)?;
    let namespace = format!("repo:{id}");
    if let Some(cached) = state.cache.get(&namespace, "status") {
        return Ok(Json(serde_json::json!({ "success": true, "status": cached, "cached": true })));
    }
    let repo_status = state.git.status(&repo).await?;
    let value = serde_json::to_value(&repo_status).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.cache.set(&namespace, "status", value.clone());
    Ok(Json(serde_json::json!({ "success": true, "status": value, "cached": false })))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

fn default_search_limit() -> usize {
    50
}

async fn search_files(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = find(&state, id)?;
    let namespace = format!("repo:{id}");
    let key = format!("files:{}:{}", params.query, params.limit);
    if let Some(cached) = state.cache.get(&namespace, &key) {
        return Ok(Json(serde_json::json!({ "success": true, "files": cached, "cached": true })));
    }

    let repo_path = state.git.repo_path(&repo);
    let mut entries = Vec::new();
    collect_files(&repo_path, &repo_path, &mut entries);
    let ranked = rank_files(entries, &params.query);
    let limited: Vec<_> = ranked.into_iter().take(params.limit).collect();

    let value = serde_json::to_value(&limited).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.cache.set(&namespace, &key, value.clone());
    Ok(Json(serde_json::json!({ "success": true, "files": value, "cached": false })))
}

fn collect_files(root: &std::path::Path, dir: &std::path::Path, out: &mut Vec<String>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else { return };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.file_name().map(|n| n == ".git").unwrap_or(false) {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Ranks paths for a filename search: exact filename match first, then
/// filename-prefix, then filename-substring, then path-substring. When
/// `query` is non-empty, entries matching none of those tiers are dropped
/// rather than merely sorted last.
fn rank_files(mut paths: Vec<String>, query: &str) -> Vec<String> {
    let needle = query.to_ascii_lowercase();
    if !needle.is_empty() {
        paths.retain(|p| rank_of(p, &needle) < 4);
    }
    paths.sort_by(|a, b| {
        rank_of(a, &needle)
            .cmp(&rank_of(b, &needle))
            .then_with(|| a.cmp(b))
    });
    paths
}

fn rank_of(path: &str, needle: &str) -> u8 {
    if needle.is_empty() {
        return 4;
    }
    let filename = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    let lower_path = path.to_ascii_lowercase();
    if filename == needle {
        0
    } else if filename.starts_with(needle) {
        1
    } else if filename.contains(needle) {
        2
    } else if lower_path.contains(needle) {
        3
    } else {
        4
    }
}
