// handlers/public/mod.rs - Public handlers (no token required)
//
// Read-only profile browsing. Mounted without auth_middleware.
pub mod profile;

pub use profile::{profile_get_by_user, profile_list};
