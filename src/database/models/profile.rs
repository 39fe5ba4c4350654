use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::user::UserSummary;
use crate::types::ObjectId;

/// Developer profile, at most one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub degree: String,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

/// The set of profile fields supplied by one upsert call.
///
/// `None` means the key was absent and must not be written; `Some("")`
/// is a real value and is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl ProfileFields {
    /// Overwrite exactly the supplied fields on an existing profile.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = &self.company {
            profile.company = Some(v.clone());
        }
        if let Some(v) = &self.website {
            profile.website = Some(v.clone());
        }
        if let Some(v) = &self.location {
            profile.location = Some(v.clone());
        }
        if let Some(v) = &self.status {
            profile.status = Some(v.clone());
        }
        if let Some(v) = &self.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &self.skills {
            profile.skills = v.clone();
        }
    }

    /// Build a fresh profile for `user` from the supplied fields.
    pub fn into_profile(self, user: ObjectId) -> Profile {
        Profile {
            id: ObjectId::new(),
            user,
            company: self.company,
            website: self.website,
            location: self.location,
            status: self.status,
            bio: self.bio,
            skills: self.skills.unwrap_or_default(),
            experience: Vec::new(),
            education: Vec::new(),
            date: Utc::now(),
        }
    }
}

/// Split a comma-delimited skills string into trimmed, non-empty entries.
pub fn normalize_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Profile as returned to clients, with the owner's display fields joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// `null` when the owning user record no longer exists
    pub user: Option<UserSummary>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub date: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(profile: Profile, user: Option<UserSummary>) -> Self {
        Self {
            id: profile.id,
            user,
            company: profile.company,
            website: profile.website,
            location: profile.location,
            status: profile.status,
            bio: profile.bio,
            skills: profile.skills,
            experience: profile.experience,
            education: profile.education,
            date: profile.date,
        }
    }
}
