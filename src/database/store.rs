//! Store interfaces between the handlers and a persistence backend.
//!
//! Every mutation that guards an invariant (one like per user, comment and
//! post ownership, one profile per user) is a single call here so that a
//! backend can apply it atomically. Handlers never check-then-write.

use async_trait::async_trait;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::database::models::{Comment, Education, Experience, Like, Post, ProfileFields, ProfileView, User};
use crate::types::ObjectId;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,

    /// Experience or education entry id not present on the profile
    #[error("profile entry not found")]
    EntryNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,

    #[error("caller does not own this resource")]
    NotOwner,

    #[error("post already liked")]
    AlreadyLiked,

    #[error("post has not yet been liked")]
    NotLiked,

    #[error("comment does not exist")]
    CommentNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Read access to the identity collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError>;

    /// Cheap round trip used by the health endpoint
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_by_user(&self, user: &ObjectId) -> Result<ProfileView, ProfileError>;

    /// Create the user's profile, or overwrite exactly the supplied fields.
    async fn upsert(&self, user: &ObjectId, fields: ProfileFields) -> Result<ProfileView, ProfileError>;

    async fn list_all(&self) -> Result<Vec<ProfileView>, ProfileError>;

    /// Remove the profile and the owning user record. Missing records are not an error.
    async fn delete_by_user(&self, user: &ObjectId) -> Result<(), ProfileError>;

    async fn add_experience(&self, user: &ObjectId, experience: Experience) -> Result<ProfileView, ProfileError>;

    async fn remove_experience(&self, user: &ObjectId, experience_id: &ObjectId) -> Result<ProfileView, ProfileError>;

    async fn add_education(&self, user: &ObjectId, education: Education) -> Result<ProfileView, ProfileError>;

    async fn remove_education(&self, user: &ObjectId, education_id: &ObjectId) -> Result<ProfileView, ProfileError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, author: &User, text: String) -> Result<Post, PostError>;

    /// All posts, most recent first
    async fn list_all(&self) -> Result<Vec<Post>, PostError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Post, PostError>;

    async fn delete_by_id(&self, id: &ObjectId, caller: &ObjectId) -> Result<(), PostError>;

    /// Add `caller` to the front of the likes if not already present.
    async fn like(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError>;

    /// Remove the first like entry belonging to `caller`.
    async fn unlike(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError>;

    async fn add_comment(&self, id: &ObjectId, author: &User, text: String) -> Result<Vec<Comment>, PostError>;

    /// Remove a comment by id, only when `caller` wrote it.
    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        caller: &ObjectId,
    ) -> Result<Vec<Comment>, PostError>;
}
