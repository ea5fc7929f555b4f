// common/src/session.rs
//! Signed, expiring session tokens (HS256 JWT).
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigurationError;
use crate::models::session::{SessionClaims, SessionUser};

/// Minimum HS256 key length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Reasons a session token is not accepted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session signature is invalid")]
    InvalidSignature,
    #[error("session has expired")]
    Expired,
    #[error("session token is malformed")]
    Malformed,
    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
    #[error("failed to encode session token: {0}")]
    Encode(String),
}

// JWT body
#[derive(Debug, Serialize, Deserialize)]
struct TokenBody {
    user: SessionUser,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with one process-wide key.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish()
    }
}

impl SessionCodec {
    /// Fails when the key is shorter than [`MIN_SIGNING_KEY_LEN`].
    pub fn new(secret: &[u8]) -> Result<Self, ConfigurationError> {
        if secret.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigurationError::WeakSigningKey {
                len: secret.len(),
                min: MIN_SIGNING_KEY_LEN,
            });
        }

        // Expiry is checked against the caller's clock, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign `claims`, stamping `now` as the issue time.
    pub fn issue(&self, claims: &SessionClaims, now: DateTime<Utc>) -> Result<String, SessionError> {
        let body = TokenBody {
            user: claims.user.clone(),
            iat: now.timestamp(),
            exp: claims.expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &body, &self.encoding)
            .map_err(|e| SessionError::Encode(e.to_string()))
    }

    /// Check signature and structure, then reject if `now` is at or past the expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        let data = decode::<TokenBody>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                _ => SessionError::Malformed,
            }
        })?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or(SessionError::Malformed)?;
        let claims = SessionClaims::new(data.claims.user, expires_at);

        if claims.is_expired_at(now) {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }
}
