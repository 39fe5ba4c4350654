use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::{EducationRequest, ExperienceRequest, ProfileRequest, ValidatedJson};
use crate::app::AppState;
use crate::database::models::ProfileView;
use crate::database::ProfileError;
use crate::error::ApiError;
use crate::handlers::parse_path_id;
use crate::types::Identity;

/// GET /api/profile/me - the caller's own profile
pub async fn profile_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = state.profiles.get_by_user(&identity.user).await?;
    Ok(Json(profile))
}

/// POST /api/profile - create or update the caller's profile
///
/// Only keys present in the body are written; an empty string is a value.
pub async fn profile_upsert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(body): ValidatedJson<ProfileRequest>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = state.profiles.upsert(&identity.user, body.into_fields()).await?;
    Ok(Json(profile))
}

/// DELETE /api/profile - remove the caller's profile and user record
pub async fn profile_delete_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    delete_cascade(&state, &identity).await
}

/// DELETE /api/profile/user/:id - owner-only variant addressed by user id
pub async fn profile_delete_by_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = parse_path_id(&user_id, || ApiError::bad_request("Profile not found"))?;
    if !identity.owns(&user) {
        return Err(ApiError::unauthorized("User not authorized"));
    }
    delete_cascade(&state, &identity).await
}

async fn delete_cascade(state: &AppState, identity: &Identity) -> Result<Json<Value>, ApiError> {
    state.profiles.delete_by_user(&identity.user).await?;
    info!("Deleted profile and user {}", identity.user);
    Ok(Json(json!({ "message": "User deleted" })))
}

/// PUT /api/profile/experience - prepend an experience entry
pub async fn experience_add(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(body): ValidatedJson<ExperienceRequest>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = state
        .profiles
        .add_experience(&identity.user, body.into_experience())
        .await?;
    Ok(Json(profile))
}

/// DELETE /api/profile/experience/:exp_id
pub async fn experience_remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(exp_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let not_found = || ApiError::not_found("Experience not found");
    let exp_id = parse_path_id(&exp_id, not_found)?;

    match state.profiles.remove_experience(&identity.user, &exp_id).await {
        Ok(profile) => Ok(Json(profile)),
        Err(ProfileError::EntryNotFound) => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

/// PUT /api/profile/education - prepend an education entry
pub async fn education_add(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(body): ValidatedJson<EducationRequest>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = state
        .profiles
        .add_education(&identity.user, body.into_education())
        .await?;
    Ok(Json(profile))
}

/// DELETE /api/profile/education/:edu_id
pub async fn education_remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(edu_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let not_found = || ApiError::not_found("Education not found");
    let edu_id = parse_path_id(&edu_id, not_found)?;

    match state.profiles.remove_education(&identity.user, &edu_id).await {
        Ok(profile) => Ok(Json(profile)),
        Err(ProfileError::EntryNotFound) => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}
