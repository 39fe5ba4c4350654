use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ObjectId;

/// Identity record owned by the registration flow. Read here for display
/// snapshots and deleted by the profile cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub date: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            email: email.into(),
            avatar,
            date: Utc::now(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Display fields joined onto profiles when they are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub avatar: Option<String>,
}
