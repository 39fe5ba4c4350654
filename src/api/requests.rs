//! Typed request bodies, one per write operation.
//!
//! Every field is optional at the serde level so that a missing key is
//! reported as a validation rule rather than a JSON parse failure.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::validation::{require, Validate};
use crate::database::models::{normalize_skills, Education, Experience, ProfileFields};
use crate::error::FieldError;
use crate::types::ObjectId;

/// Body for `POST /api/post` and `POST /api/post/comment/:id`
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl Validate for TextRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "text", "Text", &self.text);
        errors
    }
}

impl TextRequest {
    pub fn into_text(self) -> String {
        self.text.unwrap_or_default()
    }
}

/// Body for `POST /api/profile`. Skills arrive as one comma-delimited string.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
}

impl Validate for ProfileRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let skills = self.skills.as_deref().map(normalize_skills).unwrap_or_default();
        if skills.is_empty() {
            errors.push(FieldError::new("skills", "Skills is required"));
        }
        errors
    }
}

impl ProfileRequest {
    pub fn into_fields(self) -> ProfileFields {
        ProfileFields {
            company: self.company,
            website: self.website,
            location: self.location,
            status: self.status,
            bio: self.bio,
            skills: self.skills.as_deref().map(normalize_skills),
        }
    }
}

/// Body for `PUT /api/profile/experience`
#[derive(Debug, Deserialize)]
pub struct ExperienceRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for ExperienceRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", "Title", &self.title);
        require(&mut errors, "company", "Company", &self.company);
        errors
    }
}

impl ExperienceRequest {
    pub fn into_experience(self) -> Experience {
        Experience {
            id: ObjectId::new(),
            title: self.title.unwrap_or_default(),
            company: self.company.unwrap_or_default(),
            location: self.location,
            description: self.description,
        }
    }
}

/// Body for `PUT /api/profile/education`. `endDate` is an ISO date.
#[derive(Debug, Deserialize)]
pub struct EducationRequest {
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl Validate for EducationRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "degree", "Degree", &self.degree);
        errors
    }
}

impl EducationRequest {
    pub fn into_education(self) -> Education {
        Education {
            id: ObjectId::new(),
            degree: self.degree.unwrap_or_default(),
            end_date: self.end_date,
        }
    }
}
