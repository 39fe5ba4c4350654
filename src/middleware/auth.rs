use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::config::AUTH_HEADER;
use crate::error::ApiError;

/// Token authentication middleware. Verifies the `x-auth-token` header and
/// injects the caller's `Identity` into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_headers(&headers)?;

    let identity = state.verifier.verify(token).map_err(|e| {
        warn!("Rejected token on {}: {}", request.uri().path(), e.reason);
        ApiError::unauthorized_with_reason("Unauthorized: invalid token", e.reason)
    })?;

    debug!("Authenticated user {}", identity.user);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Extract the raw token from the auth header
fn extract_token_from_headers(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = match headers.get(AUTH_HEADER) {
        Some(value) => value,
        None => return Err(ApiError::unauthorized("Unauthorized: missing token")),
    };

    let token = value.to_str().map_err(|_| {
        ApiError::unauthorized_with_reason("Unauthorized: invalid token", "header is not valid UTF-8")
    })?;

    if token.trim().is_empty() {
        return Err(ApiError::unauthorized("Unauthorized: missing token"));
    }
    Ok(token.trim())
}
