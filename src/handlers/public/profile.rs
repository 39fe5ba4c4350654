use axum::{
    extract::{Path, State},
    Json,
};

use crate::app::AppState;
use crate::database::models::ProfileView;
use crate::database::ProfileError;
use crate::error::ApiError;
use crate::handlers::parse_path_id;

/// GET /api/profile - every profile with its owner joined in
pub async fn profile_list(State(state): State<AppState>) -> Result<Json<Vec<ProfileView>>, ApiError> {
    let profiles = state.profiles.list_all().await?;
    Ok(Json(profiles))
}

/// GET /api/profile/user/:id - a user's profile; malformed ids are rejected before lookup
pub async fn profile_get_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let user = parse_path_id(&user_id, || ApiError::bad_request("Profile not found"))?;

    match state.profiles.get_by_user(&user).await {
        Ok(profile) => Ok(Json(profile)),
        Err(ProfileError::NotFound) => Err(ApiError::bad_request("Profile not found")),
        Err(e) => Err(e.into()),
    }
}
