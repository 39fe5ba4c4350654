use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::Identity;

use super::load_caller;

/// GET /api/auth - the user record behind the presented token
pub async fn auth_whoami(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<User>, ApiError> {
    let user = load_caller(&state, &identity).await?;
    Ok(Json(user))
}
