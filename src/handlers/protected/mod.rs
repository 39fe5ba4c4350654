// handlers/protected/mod.rs - Protected handlers (token required)
//
// Every handler here receives the caller's `Identity` from auth_middleware.
// Ownership checks compare that identity against the stored owner id.
pub mod auth;
pub mod post;
pub mod profile;

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::Identity;

/// Load the caller's user record for name/avatar snapshots.
pub(crate) async fn load_caller(state: &AppState, identity: &Identity) -> Result<User, ApiError> {
    state
        .users
        .find_user(&identity.user)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
