use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use registrar_core::UserId;

/// Session token claims.
///
/// Nothing here is persisted server-side: a token is valid purely because its
/// signature checks out and `now` falls inside `[iat, exp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject user id.
    #[serde(rename = "userId")]
    pub user_id: UserId,

    /// Username at the time the token was issued.
    pub username: String,

    /// Random session identifier (hex, 128 bits).
    pub sid: String,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// `None` when `issued_at + ttl` falls outside the representable clock range.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        sid: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(ttl)?;
        Some(Self {
            user_id,
            username: username.into(),
            sid: sid.into(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of already-decoded claims.
///
/// Signature verification happens in [`crate::token`]; this only looks at the
/// timestamps so callers can pin `now` in tests.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), ClaimsValidationError> {
    if claims.exp <= claims.iat {
        return Err(ClaimsValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(ClaimsValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(ClaimsValidationError::Expired);
    }
    Ok(())
}
