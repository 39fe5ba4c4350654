// handlers/mod.rs - Two-tier handler layout
//
// Public (no token) → Protected (x-auth-token verified by auth_middleware)
pub mod protected;
pub mod public;

use crate::error::ApiError;
use crate::types::ObjectId;

/// Parse a path id, mapping a malformed value to `on_invalid` before any
/// store access.
pub(crate) fn parse_path_id(raw: &str, on_invalid: impl FnOnce() -> ApiError) -> Result<ObjectId, ApiError> {
    raw.parse::<ObjectId>().map_err(|_| on_invalid())
}
