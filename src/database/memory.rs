use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Comment, Education, Experience, Like, Post, Profile, ProfileFields, ProfileView, User,
};
use crate::database::store::{PostError, PostStore, ProfileError, ProfileStore, UserStore};
use crate::types::ObjectId;

/// In-process backend. Each operation holds the write lock across its check
/// and its mutation, so conditional updates are atomic with respect to
/// concurrent requests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<ObjectId, User>,
    /// Keyed by owning user
    profiles: HashMap<ObjectId, Profile>,
    /// Newest first
    posts: Vec<Post>,
}

impl MemoryState {
    fn view(&self, profile: &Profile) -> ProfileView {
        let user = self.users.get(&profile.user).map(User::summary);
        ProfileView::new(profile.clone(), user)
    }

    fn post_mut(&mut self, id: &ObjectId) -> Result<&mut Post, PostError> {
        self.posts
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or(PostError::NotFound)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity record. Users are created by the registration
    /// flow in production; this seeds them for development and tests.
    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_by_user(&self, user: &ObjectId) -> Result<ProfileView, ProfileError> {
        let state = self.state.read().await;
        let profile = state.profiles.get(user).ok_or(ProfileError::NotFound)?;
        Ok(state.view(profile))
    }

    async fn upsert(&self, user: &ObjectId, fields: ProfileFields) -> Result<ProfileView, ProfileError> {
        let mut state = self.state.write().await;
        let profile = match state.profiles.entry(*user) {
            Entry::Occupied(mut existing) => {
                fields.apply_to(existing.get_mut());
                existing.get().clone()
            }
            Entry::Vacant(slot) => slot.insert(fields.into_profile(*user)).clone(),
        };
        Ok(state.view(&profile))
    }

    async fn list_all(&self) -> Result<Vec<ProfileView>, ProfileError> {
        let state = self.state.read().await;
        let mut profiles: Vec<&Profile> = state.profiles.values().collect();
        profiles.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(profiles.into_iter().map(|p| state.view(p)).collect())
    }

    async fn delete_by_user(&self, user: &ObjectId) -> Result<(), ProfileError> {
        let mut state = self.state.write().await;
        state.profiles.remove(user);
        state.users.remove(user);
        Ok(())
    }

    async fn add_experience(&self, user: &ObjectId, experience: Experience) -> Result<ProfileView, ProfileError> {
        let mut state = self.state.write().await;
        let profile = state.profiles.get_mut(user).ok_or(ProfileError::NotFound)?;
        profile.experience.insert(0, experience);
        let profile = profile.clone();
        Ok(state.view(&profile))
    }

    async fn remove_experience(&self, user: &ObjectId, experience_id: &ObjectId) -> Result<ProfileView, ProfileError> {
        let mut state = self.state.write().await;
        let profile = state.profiles.get_mut(user).ok_or(ProfileError::NotFound)?;
        let index = profile
            .experience
            .iter()
            .position(|e| e.id == *experience_id)
            .ok_or(ProfileError::EntryNotFound)?;
        profile.experience.remove(index);
        let profile = profile.clone();
        Ok(state.view(&profile))
    }

    async fn add_education(&self, user: &ObjectId, education: Education) -> Result<ProfileView, ProfileError> {
        let mut state = self.state.write().await;
        let profile = state.profiles.get_mut(user).ok_or(ProfileError::NotFound)?;
        profile.education.insert(0, education);
        let profile = profile.clone();
        Ok(state.view(&profile))
    }

    async fn remove_education(&self, user: &ObjectId, education_id: &ObjectId) -> Result<ProfileView, ProfileError> {
        let mut state = self.state.write().await;
        let profile = state.profiles.get_mut(user).ok_or(ProfileError::NotFound)?;
        let index = profile
            .education
            .iter()
            .position(|e| e.id == *education_id)
            .ok_or(ProfileError::EntryNotFound)?;
        profile.education.remove(index);
        let profile = profile.clone();
        Ok(state.view(&profile))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create(&self, author: &User, text: String) -> Result<Post, PostError> {
        let post = Post::new(author, text);
        self.state.write().await.posts.insert(0, post.clone());
        Ok(post)
    }

    async fn list_all(&self) -> Result<Vec<Post>, PostError> {
        let mut posts = self.state.read().await.posts.clone();
        // Stable sort keeps insertion order for equal timestamps
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Post, PostError> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.id == *id)
            .cloned()
            .ok_or(PostError::NotFound)
    }

    async fn delete_by_id(&self, id: &ObjectId, caller: &ObjectId) -> Result<(), PostError> {
        let mut state = self.state.write().await;
        let index = state
            .posts
            .iter()
            .position(|p| p.id == *id)
            .ok_or(PostError::NotFound)?;
        if state.posts[index].user != *caller {
            return Err(PostError::NotOwner);
        }
        state.posts.remove(index);
        Ok(())
    }

    async fn like(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError> {
        let mut state = self.state.write().await;
        let post = state.post_mut(id)?;
        if post.is_liked_by(caller) {
            return Err(PostError::AlreadyLiked);
        }
        post.likes.insert(0, Like { user: *caller });
        Ok(post.likes.clone())
    }

    async fn unlike(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError> {
        let mut state = self.state.write().await;
        let post = state.post_mut(id)?;
        let index = post
            .likes
            .iter()
            .position(|like| like.user == *caller)
            .ok_or(PostError::NotLiked)?;
        post.likes.remove(index);
        Ok(post.likes.clone())
    }

    async fn add_comment(&self, id: &ObjectId, author: &User, text: String) -> Result<Vec<Comment>, PostError> {
        let mut state = self.state.write().await;
        let post = state.post_mut(id)?;
        post.comments.insert(0, Comment::new(author, text));
        Ok(post.comments.clone())
    }

    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        caller: &ObjectId,
    ) -> Result<Vec<Comment>, PostError> {
        let mut state = self.state.write().await;
        let post = state.post_mut(id)?;
        let index = post
            .comments
            .iter()
            .position(|c| c.id == *comment_id)
            .ok_or(PostError::CommentNotFound)?;
        if post.comments[index].user != *caller {
            return Err(PostError::NotOwner);
        }
        post.comments.remove(index);
        Ok(post.comments.clone())
    }
}
