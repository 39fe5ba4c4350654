use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Comment, Education, Experience, Like, Post, Profile, ProfileFields, ProfileView, User, UserSummary,
};
use crate::database::store::{PostError, PostStore, ProfileError, ProfileStore, UserStore};
use crate::types::ObjectId;

/// Postgres backend. Invariant-guarding mutations are single conditional
/// statements (`ON CONFLICT`, `DELETE ... WHERE owner`), so they stay correct
/// under concurrent requests without explicit locking.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for ProfileError {
    fn from(err: sqlx::Error) -> Self {
        ProfileError::Database(err.into())
    }
}

impl From<sqlx::Error> for PostError {
    fn from(err: sqlx::Error) -> Self {
        PostError::Database(err.into())
    }
}

fn parse_id(raw: &str) -> Result<ObjectId, DatabaseError> {
    raw.parse::<ObjectId>()
        .map_err(|e| DatabaseError::Corrupt(e.to_string()))
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    avatar: Option<String>,
    date: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_id(&row.id)?,
            name: row.name,
            email: row.email,
            avatar: row.avatar,
            date: row.date,
        })
    }
}

/// Profile joined with its owner's display fields
#[derive(FromRow)]
struct ProfileRow {
    id: String,
    user_id: String,
    company: Option<String>,
    website: Option<String>,
    location: Option<String>,
    status: Option<String>,
    bio: Option<String>,
    skills: Vec<String>,
    experience: Json<Vec<Experience>>,
    education: Json<Vec<Education>>,
    date: DateTime<Utc>,
    owner_name: Option<String>,
    owner_avatar: Option<String>,
}

impl TryFrom<ProfileRow> for ProfileView {
    type Error = DatabaseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let user = parse_id(&row.user_id)?;
        let owner = row.owner_name.map(|name| UserSummary {
            id: user,
            name,
            avatar: row.owner_avatar,
        });
        let profile = Profile {
            id: parse_id(&row.id)?,
            user,
            company: row.company,
            website: row.website,
            location: row.location,
            status: row.status,
            bio: row.bio,
            skills: row.skills,
            experience: row.experience.0,
            education: row.education.0,
            date: row.date,
        };
        Ok(ProfileView::new(profile, owner))
    }
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    user_id: String,
    text: String,
    name: String,
    avatar: Option<String>,
    date: DateTime<Utc>,
}

#[derive(FromRow)]
struct LikeRow {
    post_id: String,
    user_id: String,
}

#[derive(FromRow)]
struct CommentRow {
    id: String,
    post_id: String,
    user_id: String,
    text: String,
    name: String,
    avatar: Option<String>,
    date: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DatabaseError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: parse_id(&row.id)?,
            user: parse_id(&row.user_id)?,
            text: row.text,
            name: row.name,
            avatar: row.avatar,
            date: row.date,
        })
    }
}

const PROFILE_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.company, p.website, p.location, p.status, p.bio,
           p.skills, p.experience, p.education, p.date,
           u.name AS owner_name, u.avatar AS owner_avatar
    FROM profiles p
    LEFT JOIN users u ON u.id = p.user_id
"#;

const POST_COLUMNS: &str = "id, user_id, text, name, avatar, date";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, text, name, avatar, date";

/// A profile column value supplied by an upsert
enum ProfileValue {
    Text(String),
    TextArray(Vec<String>),
}

fn supplied_columns(fields: ProfileFields) -> Vec<(&'static str, ProfileValue)> {
    let mut columns = Vec::new();
    let text_fields = [
        ("company", fields.company),
        ("website", fields.website),
        ("location", fields.location),
        ("status", fields.status),
        ("bio", fields.bio),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value {
            columns.push((column, ProfileValue::Text(value)));
        }
    }
    if let Some(skills) = fields.skills {
        columns.push(("skills", ProfileValue::TextArray(skills)));
    }
    columns
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email, avatar, date FROM users WHERE id = $1")
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

impl PgStore {
    async fn profile_exists(&self, user: &ObjectId) -> Result<bool, ProfileError> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM profiles WHERE user_id = $1")
            .bind(user.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Prepend one entry to a JSONB array column of the user's profile.
    async fn prepend_entry<T: serde::Serialize + Send + Sync + 'static>(
        &self,
        column: &'static str,
        user: &ObjectId,
        entry: T,
    ) -> Result<ProfileView, ProfileError> {
        let sql = format!(
            "UPDATE profiles SET {column} = $2::jsonb || {column} WHERE user_id = $1 RETURNING id"
        );
        let updated: Option<(String,)> = sqlx::query_as(&sql)
            .bind(user.to_hex())
            .bind(Json(vec![entry]))
            .fetch_optional(&self.pool)
            .await?;
        if updated.is_none() {
            return Err(ProfileError::NotFound);
        }
        self.get_by_user(user).await
    }

    /// Remove the entry with `_id == entry_id` from a JSONB array column,
    /// keeping the order of the remaining entries.
    async fn remove_entry(
        &self,
        column: &'static str,
        user: &ObjectId,
        entry_id: &ObjectId,
    ) -> Result<ProfileView, ProfileError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET {column} = (
                SELECT COALESCE(jsonb_agg(e ORDER BY ord), '[]'::jsonb)
                FROM jsonb_array_elements({column}) WITH ORDINALITY AS t(e, ord)
                WHERE e->>'_id' <> $2
            )
            WHERE user_id = $1
              AND {column} @> jsonb_build_array(jsonb_build_object('_id', $2::text))
            RETURNING id
            "#
        );
        let updated: Option<(String,)> = sqlx::query_as(&sql)
            .bind(user.to_hex())
            .bind(entry_id.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        if updated.is_none() {
            return Err(if self.profile_exists(user).await? {
                ProfileError::EntryNotFound
            } else {
                ProfileError::NotFound
            });
        }
        self.get_by_user(user).await
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_by_user(&self, user: &ObjectId) -> Result<ProfileView, ProfileError> {
        let sql = format!("{PROFILE_SELECT} WHERE p.user_id = $1");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user.to_hex())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ProfileError::NotFound)?;
        Ok(ProfileView::try_from(row)?)
    }

    async fn upsert(&self, user: &ObjectId, fields: ProfileFields) -> Result<ProfileView, ProfileError> {
        let columns = supplied_columns(fields);
        let names: Vec<&'static str> = columns.iter().map(|(name, _)| *name).collect();

        // Single statement: insert, or overwrite only the supplied columns
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO profiles (id, user_id, date");
        for name in &names {
            query.push(", ").push(*name);
        }
        query.push(") VALUES (");
        query.push_bind(ObjectId::new().to_hex());
        query.push(", ");
        query.push_bind(user.to_hex());
        query.push(", ");
        query.push_bind(Utc::now());
        for (_, value) in columns {
            query.push(", ");
            match value {
                ProfileValue::Text(v) => query.push_bind(v),
                ProfileValue::TextArray(v) => query.push_bind(v),
            };
        }
        query.push(") ON CONFLICT (user_id) DO UPDATE SET ");
        if names.is_empty() {
            query.push("user_id = EXCLUDED.user_id");
        } else {
            let mut assignments = query.separated(", ");
            for name in &names {
                assignments.push(format!("{name} = EXCLUDED.{name}"));
            }
        }
        query.push(" RETURNING id");

        query.build().execute(&self.pool).await?;
        self.get_by_user(user).await
    }

    async fn list_all(&self) -> Result<Vec<ProfileView>, ProfileError> {
        let sql = format!("{PROFILE_SELECT} ORDER BY p.date ASC, p.id ASC");
        let rows = sqlx::query_as::<_, ProfileRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| ProfileView::try_from(row).map_err(ProfileError::from))
            .collect()
    }

    async fn delete_by_user(&self, user: &ObjectId) -> Result<(), ProfileError> {
        let id = user.to_hex();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_experience(&self, user: &ObjectId, experience: Experience) -> Result<ProfileView, ProfileError> {
        self.prepend_entry("experience", user, experience).await
    }

    async fn remove_experience(&self, user: &ObjectId, experience_id: &ObjectId) -> Result<ProfileView, ProfileError> {
        self.remove_entry("experience", user, experience_id).await
    }

    async fn add_education(&self, user: &ObjectId, education: Education) -> Result<ProfileView, ProfileError> {
        self.prepend_entry("education", user, education).await
    }

    async fn remove_education(&self, user: &ObjectId, education_id: &ObjectId) -> Result<ProfileView, ProfileError> {
        self.remove_entry("education", user, education_id).await
    }
}

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

impl PgStore {
    async fn post_exists(&self, id: &ObjectId) -> Result<bool, PostError> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn likes_for(&self, id: &ObjectId) -> Result<Vec<Like>, PostError> {
        let rows = sqlx::query_as::<_, LikeRow>(
            "SELECT post_id, user_id FROM post_likes WHERE post_id = $1 ORDER BY seq DESC",
        )
        .bind(id.to_hex())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| -> Result<Like, PostError> { Ok(Like { user: parse_id(&row.user_id)? }) })
            .collect()
    }

    async fn comments_for(&self, id: &ObjectId) -> Result<Vec<Comment>, PostError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM post_comments WHERE post_id = $1 ORDER BY seq DESC");
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id.to_hex())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Comment::try_from(row).map_err(PostError::from))
            .collect()
    }

    /// Attach likes and comments to post rows, preserving row order.
    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, PostError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let comments_sql =
            format!("SELECT {COMMENT_COLUMNS} FROM post_comments WHERE post_id = ANY($1) ORDER BY seq DESC");

        let (like_rows, comment_rows) = futures::try_join!(
            sqlx::query_as::<_, LikeRow>(
                "SELECT post_id, user_id FROM post_likes WHERE post_id = ANY($1) ORDER BY seq DESC",
            )
            .bind(ids.clone())
            .fetch_all(&self.pool),
            sqlx::query_as::<_, CommentRow>(&comments_sql)
                .bind(ids)
                .fetch_all(&self.pool),
        )?;

        let mut likes: HashMap<String, Vec<Like>> = HashMap::new();
        for row in like_rows {
            let user = parse_id(&row.user_id)?;
            likes.entry(row.post_id).or_default().push(Like { user });
        }
        let mut comments: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            let post_id = row.post_id.clone();
            comments.entry(post_id).or_default().push(Comment::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| -> Result<Post, PostError> {
                Ok(Post {
                    id: parse_id(&row.id)?,
                    user: parse_id(&row.user_id)?,
                    likes: likes.remove(&row.id).unwrap_or_default(),
                    comments: comments.remove(&row.id).unwrap_or_default(),
                    text: row.text,
                    name: row.name,
                    avatar: row.avatar,
                    date: row.date,
                })
            })
            .collect()
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn create(&self, author: &User, text: String) -> Result<Post, PostError> {
        let post = Post::new(author, text);
        sqlx::query("INSERT INTO posts (id, user_id, text, name, avatar, date) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(post.id.to_hex())
            .bind(post.user.to_hex())
            .bind(&post.text)
            .bind(&post.name)
            .bind(&post.avatar)
            .bind(post.date)
            .execute(&self.pool)
            .await?;
        Ok(post)
    }

    async fn list_all(&self) -> Result<Vec<Post>, PostError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY date DESC, id DESC");
        let rows = sqlx::query_as::<_, PostRow>(&sql).fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Post, PostError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PostError::NotFound)?;
        self.hydrate(vec![row]).await?.pop().ok_or(PostError::NotFound)
    }

    async fn delete_by_id(&self, id: &ObjectId, caller: &ObjectId) -> Result<(), PostError> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id.to_hex())
            .bind(caller.to_hex())
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 1 {
            return Ok(());
        }
        Err(if self.post_exists(id).await? {
            PostError::NotOwner
        } else {
            PostError::NotFound
        })
    }

    async fn like(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError> {
        let inserted = sqlx::query(
            "INSERT INTO post_likes (post_id, user_id) \
             SELECT id, $2 FROM posts WHERE id = $1 \
             ON CONFLICT (post_id, user_id) DO NOTHING",
        )
        .bind(id.to_hex())
        .bind(caller.to_hex())
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(if self.post_exists(id).await? {
                PostError::AlreadyLiked
            } else {
                PostError::NotFound
            });
        }
        self.likes_for(id).await
    }

    async fn unlike(&self, id: &ObjectId, caller: &ObjectId) -> Result<Vec<Like>, PostError> {
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(id.to_hex())
            .bind(caller.to_hex())
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(if self.post_exists(id).await? {
                PostError::NotLiked
            } else {
                PostError::NotFound
            });
        }
        self.likes_for(id).await
    }

    async fn add_comment(&self, id: &ObjectId, author: &User, text: String) -> Result<Vec<Comment>, PostError> {
        let comment = Comment::new(author, text);
        let inserted = sqlx::query(
            "INSERT INTO post_comments (id, post_id, user_id, text, name, avatar, date) \
             SELECT $1, id, $3, $4, $5, $6, $7 FROM posts WHERE id = $2",
        )
        .bind(comment.id.to_hex())
        .bind(id.to_hex())
        .bind(comment.user.to_hex())
        .bind(&comment.text)
        .bind(&comment.name)
        .bind(&comment.avatar)
        .bind(comment.date)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(PostError::NotFound);
        }
        self.comments_for(id).await
    }

    async fn remove_comment(
        &self,
        id: &ObjectId,
        comment_id: &ObjectId,
        caller: &ObjectId,
    ) -> Result<Vec<Comment>, PostError> {
        let removed = sqlx::query("DELETE FROM post_comments WHERE id = $1 AND post_id = $2 AND user_id = $3")
            .bind(comment_id.to_hex())
            .bind(id.to_hex())
            .bind(caller.to_hex())
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() == 1 {
            return self.comments_for(id).await;
        }

        let author: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM post_comments WHERE id = $1 AND post_id = $2")
                .bind(comment_id.to_hex())
                .bind(id.to_hex())
                .fetch_optional(&self.pool)
                .await?;
        Err(if author.is_some() {
            PostError::NotOwner
        } else if self.post_exists(id).await? {
            PostError::CommentNotFound
        } else {
            PostError::NotFound
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supplied_profile_fields_become_columns() {
        let columns = supplied_columns(ProfileFields {
            company: Some("Acme".into()),
            bio: Some(String::new()),
            skills: Some(vec!["rust".into()]),
            ..Default::default()
        });
        let names: Vec<_> = columns.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["company", "bio", "skills"]);
    }

    #[test]
    fn empty_fields_produce_no_columns() {
        assert!(supplied_columns(ProfileFields::default()).is_empty());
    }

    #[test]
    fn corrupt_ids_are_reported() {
        assert!(matches!(parse_id("xyz"), Err(DatabaseError::Corrupt(_))));
        assert!(parse_id("5d7a514b5d2c12c7449be045").is_ok());
    }
}
