use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Every non-trivial endpoint requires `Authorization: Bearer <token>`
/// matching the configured API token. The token itself is opaque to this
/// service — whatever collaborator issues it is out of scope here.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Auth("missing or malformed Authorization header".to_string()))?;

    if token != state.config.api_token {
        return Err(ApiError::Auth("invalid API token".to_string()));
    }

    Ok(next.run(request).await)
}
