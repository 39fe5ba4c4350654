/// Shared types used across the codebase

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 12-byte document identifier, rendered as 24 lowercase hex characters.
///
/// Generated ids start with a big-endian creation timestamp (seconds) followed
/// by 8 random bytes, so ids sort roughly by creation time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId([u8; 12]);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid object id: {0:?}")]
pub struct InvalidObjectId(pub String);

impl ObjectId {
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Accepts exactly 24 hex characters, either case.
    pub fn parse_str(s: &str) -> Result<Self, InvalidObjectId> {
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidObjectId(s.to_string()));
        }

        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            // Both bytes are ASCII hex digits, checked above
            let pair = std::str::from_utf8(chunk).map_err(|_| InvalidObjectId(s.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| InvalidObjectId(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = InvalidObjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_str(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_hex()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

/// Authenticated caller extracted from a verified token.
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user: ObjectId,
}

impl Identity {
    pub fn new(user: ObjectId) -> Self {
        Self { user }
    }

    /// Ownership gate: does this caller own a resource recorded under `owner`?
    pub fn owns(&self, owner: &ObjectId) -> bool {
        self.user == *owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_24_hex_and_round_trip() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ObjectId::parse_str("not-a-hex-id").is_err());
        assert!(ObjectId::parse_str("5d7a514b5d2c12c7449be04").is_err());
        assert!(ObjectId::parse_str("5d7a514b5d2c12c7449be0450").is_err());
        assert!(ObjectId::parse_str("5d7a514b5d2c12c7449be04z").is_err());
        assert!(ObjectId::parse_str("").is_err());
    }

    #[test]
    fn accepts_uppercase_hex_and_normalizes() {
        let id = ObjectId::parse_str("5D7A514B5D2C12C7449BE045").unwrap();
        assert_eq!(id.to_string(), "5d7a514b5d2c12c7449be045");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ObjectId::parse_str("5d7a514b5d2c12c7449be045").unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("5d7a514b5d2c12c7449be045"));

        let bad: Result<ObjectId, _> = serde_json::from_value(serde_json::json!("nope"));
        assert!(bad.is_err());
    }

    #[test]
    fn ownership_is_id_equality() {
        let owner = ObjectId::new();
        assert!(Identity::new(owner).owns(&owner));
        assert!(!Identity::new(ObjectId::new()).owns(&owner));
    }
}
