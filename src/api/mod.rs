// Request bodies and the validating extractor shared by the handlers
pub mod requests;
pub mod validation;

pub use requests::{EducationRequest, ExperienceRequest, ProfileRequest, TextRequest};
pub use validation::{Validate, ValidatedJson};
