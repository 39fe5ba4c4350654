use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::user::User;
use crate::types::ObjectId;

/// A post with its likes and comments embedded, most recent first.
///
/// `name` and `avatar` are copied from the author when the post is created
/// and do not follow later changes to the user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub text: String,
    pub name: String,
    pub avatar: Option<String>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub text: String,
    pub name: String,
    pub avatar: Option<String>,
    pub date: DateTime<Utc>,
}

impl Post {
    pub fn new(author: &User, text: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user: author.id,
            text: text.into(),
            name: author.name.clone(),
            avatar: author.avatar.clone(),
            likes: Vec::new(),
            comments: Vec::new(),
            date: Utc::now(),
        }
    }

    pub fn is_liked_by(&self, user: &ObjectId) -> bool {
        self.likes.iter().any(|like| like.user == *user)
    }
}

impl Comment {
    pub fn new(author: &User, text: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user: author.id,
            text: text.into(),
            name: author.name.clone(),
            avatar: author.avatar.clone(),
            date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_post_snapshots_author_and_starts_empty() {
        let author = User::new("Ada", "ada@example.com", Some("//gravatar/ada".into()));
        let post = Post::new(&author, "hello");

        assert_eq!(post.user, author.id);
        assert_eq!(post.name, "Ada");
        assert_eq!(post.avatar.as_deref(), Some("//gravatar/ada"));
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
    }

    #[test]
    fn serializes_with_document_style_ids() {
        let author = User::new("Ada", "ada@example.com", None);
        let post = Post::new(&author, "hello");
        let json = serde_json::to_value(&post).unwrap();

        assert_eq!(json["_id"], post.id.to_string());
        assert_eq!(json["user"], author.id.to_string());
        assert_eq!(json["likes"], serde_json::json!([]));
    }
}
