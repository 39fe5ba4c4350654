pub mod post;
pub mod profile;
pub mod user;

pub use post::{Comment, Like, Post};
pub use profile::{normalize_skills, Education, Experience, Profile, ProfileFields, ProfileView};
pub use user::{User, UserSummary};
