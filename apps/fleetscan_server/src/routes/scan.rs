use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fleetscan_drivers::textfsm::TextFsmTemplate;
use fleetscan_model::{CredentialId, DiscoveryMode, RepositoryId, TemplateId};
use fleetscan_query::OnboardingFields;
use fleetscan_scan::{GitTarget, OnboardRequest};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/scan/start", post(start))
        .route("/api/scan/jobs", get(jobs))
        .route("/api/scan/:job_id/status", get(job_status))
        .route("/api/scan/:job_id/onboard", post(onboard))
        .route("/api/scan/:job_id", delete(remove))
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    cidrs: Vec<String>,
    credential_ids: Vec<CredentialId>,
    discovery_mode: DiscoveryMode,
    #[serde(default)]
    parser_template_ids: Vec<TemplateId>,
}

async fn start(State(state): State<AppState>, Json(body): Json<StartRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let templates = body
        .parser_template_ids
        .iter()
        .filter_map(|id| state.templates.get(*id))
        .filter_map(|t| TextFsmTemplate::parse(t.name.clone(), &t.content).ok())
        .collect::<Vec<_>>();

    let job = state
        .scans
        .start(
            body.cidrs,
            body.credential_ids,
            body.discovery_mode,
            body.parser_template_ids,
            templates,
        )
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let snapshot = job.lock().clone();
    Ok(Json(serde_json::json!({
        "job_id": snapshot.job_id,
        "total_targets": snapshot.total_targets,
        "state": snapshot.state,
    })))
}

async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state
        .scans
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("scan job {job_id}")))?;
    let snapshot = job.lock().clone();
    Ok(Json(serde_json::json!({
        "job_id": snapshot.job_id,
        "state": snapshot.state,
        "progress": snapshot.counters,
        "results": snapshot.results,
        "errors": snapshot.errors,
    })))
}

async fn jobs(State(state): State<AppState>) -> Json<serde_json::Value> {
    let jobs: Vec<_> = state.scans.list().iter().map(|job| job.lock().clone()).collect();
    Json(serde_json::json!({ "success": true, "jobs": jobs }))
}

async fn remove(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.scans.delete(&job_id) {
        return Err(ApiError::NotFound(format!("scan job {job_id}")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct OnboardBody {
    devices: Vec<String>,
    git_repository_id: Option<RepositoryId>,
    inventory_template_id: Option<TemplateId>,
    filename: Option<String>,
    #[serde(default)]
    auto_commit: bool,
    #[serde(default)]
    auto_push: bool,
    commit_message: Option<String>,
    #[serde(flatten)]
    sms_fields: OnboardingFieldsBody,
}

#[derive(Debug, Deserialize)]
struct OnboardingFieldsBody {
    #[serde(default)]
    location: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    interface_status: String,
    #[serde(default)]
    ip_status: String,
    #[serde(default = "default_platform")]
    platform: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_timeout")]
    timeout: u32,
}

fn default_platform() -> String {
    "detect".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u32 {
    30
}

async fn onboard(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(body): Json<OnboardBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job_handle = state
        .scans
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("scan job {job_id}")))?;
    let job = job_handle.lock().clone();

    let request = OnboardRequest {
        device_ips: body.devices,
        sms_fields: OnboardingFields {
            ip: String::new(),
            location: body.sms_fields.location,
            namespace: body.sms_fields.namespace,
            role: body.sms_fields.role,
            status: body.sms_fields.status,
            interface_status: body.sms_fields.interface_status,
            ip_status: body.sms_fields.ip_status,
            platform: body.sms_fields.platform,
            port: body.sms_fields.port,
            timeout: body.sms_fields.timeout,
        },
        filename: body.filename,
        auto_commit: body.auto_commit,
        auto_push: body.auto_push,
        commit_message: body.commit_message,
    };

    let repo = body.git_repository_id.and_then(|id| state.repositories.get(id));
    let template_source = body
        .inventory_template_id
        .and_then(|id| state.templates.get(id))
        .map(|t| t.content)
        .unwrap_or_default();

    let destination_root = state.config.git_root();
    let git_target = repo.as_ref().map(|repo| GitTarget {
        orchestrator: state.git.as_ref(),
        repository: repo,
        destination_root: destination_root.as_path(),
    });

    let outcome = fleetscan_scan::process_onboarding(&job, &request, &state.sms, &template_source, git_target).await;

    Ok(Json(serde_json::json!({
        "accepted": outcome.accepted,
        "cisco_queued": outcome.cisco_queued,
        "linux_added": outcome.linux_added,
        "inventory_path": outcome.inventory_path,
        "job_ids": outcome.job_ids,
        "skipped_unknown_ips": outcome.skipped_unknown_ips,
    })))
}
