use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::{Identity, ObjectId};

/// Token payload: `{"user": {"id": "<hex>"}, "exp": .., "iat": ..}`
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimsUser,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimsUser {
    pub id: ObjectId,
}

/// Verification failure, carrying the decoder's reason for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct VerificationError {
    pub reason: String,
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        let reason = match err.kind() {
            ErrorKind::ExpiredSignature => "jwt expired".to_string(),
            ErrorKind::InvalidSignature => "invalid signature".to_string(),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                "jwt malformed".to_string()
            }
            ErrorKind::Json(_) => "invalid token payload".to_string(),
            ErrorKind::InvalidAlgorithm => "invalid algorithm".to_string(),
            _ => err.to_string(),
        };
        Self { reason }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),
}

/// Signs and verifies HS256 tokens with the secret from `SecurityConfig`.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl TokenVerifier {
    pub fn new(security: &SecurityConfig) -> Self {
        let secret = security.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            expiry: Duration::hours(security.jwt_expiry_hours as i64),
        }
    }

    /// Decode and check a token, returning the identity it was issued for.
    pub fn verify(&self, token: &str) -> Result<Identity, VerificationError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(Identity::new(data.claims.user.id))
    }

    /// Issue a token for `user` valid for the configured expiry window.
    pub fn issue(&self, user: ObjectId) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&Claims {
            user: ClaimsUser { id: user },
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }
}
