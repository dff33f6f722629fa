use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error kinds, not type names: these map directly onto the status codes
/// the API surface promises callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("credential decrypt failed: {0}")]
    Decrypt(String),
    #[error("conflicting state: {0}")]
    StateConflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
            ApiError::RemoteUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "remote_unavailable"),
            ApiError::Decrypt(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decrypt_error"),
            ApiError::StateConflict(_) => (StatusCode::CONFLICT, "state_conflict"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = Json(json!({
            "success": false,
            "error": kind,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<fleetscan_security::VaultError> for ApiError {
    fn from(err: fleetscan_security::VaultError) -> Self {
        match err {
            fleetscan_security::VaultError::NotFound(id) => ApiError::NotFound(format!("credential {id}")),
            fleetscan_security::VaultError::Crypto(msg) => ApiError::Decrypt(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<fleetscan_git::GitError> for ApiError {
    fn from(err: fleetscan_git::GitError) -> Self {
        match &err {
            fleetscan_git::GitError::NotARepository(path) => {
                ApiError::NotFound(format!("git working tree at {}", path.display()))
            }
            fleetscan_git::GitError::AuthenticationFailed(msg) => ApiError::Auth(msg.clone()),
            fleetscan_git::GitError::RemoteUnavailable(_) | fleetscan_git::GitError::Timeout(_) => {
                ApiError::RemoteUnavailable(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
