use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::{TextRequest, ValidatedJson};
use crate::app::AppState;
use crate::database::models::{Comment, Like, Post};
use crate::error::ApiError;
use crate::handlers::parse_path_id;
use crate::types::{Identity, ObjectId};

use super::load_caller;

fn post_id(raw: &str) -> Result<ObjectId, ApiError> {
    parse_path_id(raw, || ApiError::not_found("Post not found"))
}

/// POST /api/post - create a post authored by the caller
pub async fn post_create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(body): ValidatedJson<TextRequest>,
) -> Result<Json<Post>, ApiError> {
    let author = load_caller(&state, &identity).await?;
    let post = state.posts.create(&author, body.into_text()).await?;
    info!("User {} created post {}", identity.user, post.id);
    Ok(Json(post))
}

/// GET /api/post - all posts, newest first
pub async fn post_list(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.posts.list_all().await?;
    Ok(Json(posts))
}

/// GET /api/post/:id
pub async fn post_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Post>, ApiError> {
    let id = post_id(&id)?;
    let post = state.posts.find_by_id(&id).await?;
    Ok(Json(post))
}

/// DELETE /api/post/:id - author only
pub async fn post_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = post_id(&id)?;
    state.posts.delete_by_id(&id, &identity.user).await?;
    info!("User {} removed post {}", identity.user, id);
    Ok(Json(json!({ "message": "Post removed" })))
}

/// PUT /api/post/like/:id
pub async fn post_like(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Like>>, ApiError> {
    let id = post_id(&id)?;
    let likes = state.posts.like(&id, &identity.user).await?;
    Ok(Json(likes))
}

/// PUT /api/post/unlike/:id
pub async fn post_unlike(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Like>>, ApiError> {
    let id = post_id(&id)?;
    let likes = state.posts.unlike(&id, &identity.user).await?;
    Ok(Json(likes))
}

/// POST /api/post/comment/:id
pub async fn comment_add(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<TextRequest>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let id = post_id(&id)?;
    let author = load_caller(&state, &identity).await?;
    let comments = state.posts.add_comment(&id, &author, body.into_text()).await?;
    Ok(Json(comments))
}

/// DELETE /api/post/comment/:id/:comment_id - comment author only
pub async fn comment_remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let id = post_id(&id)?;
    let comment_id = parse_path_id(&comment_id, || {
        ApiError::not_found("Comment does not exist for that post")
    })?;
    let comments = state
        .posts
        .remove_comment(&id, &comment_id, &identity.user)
        .await?;
    Ok(Json(comments))
}
