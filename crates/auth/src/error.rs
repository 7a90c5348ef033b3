//! Authentication/authorization failure taxonomy.
//!
//! Every variant is terminal for the request that produced it.

use thiserror::Error;

use crate::{AuthzError, PermissionCode, TokenError};

/// Generic message for bad credentials, identical whether the username or
/// the password was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown/deleted username or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No bearer token on a protected request.
    #[error("No token provided")]
    MissingToken,

    /// Malformed, expired or badly signed token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated, but the user lacks `permission`.
    #[error("missing permission '{permission}'")]
    Forbidden { permission: PermissionCode },

    /// The authenticated identity no longer resolves to a live user.
    #[error("User not found")]
    UserNotFound,

    /// Username already taken.
    #[error("Username already exists")]
    Conflict,

    /// Request input rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    /// Storage or signing failure; detail is logged, not returned.
    #[error("internal error")]
    Internal(String),
}

impl From<AuthzError> for AuthError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(permission) => AuthError::Forbidden { permission },
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing(msg) => AuthError::Internal(msg),
            _ => AuthError::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    #[test]
    fn every_token_failure_collapses_to_invalid_token() {
        for e in [
            TokenError::Expired,
            TokenError::InvalidSignature,
            TokenError::Malformed("x".into()),
        ] {
            assert_eq!(AuthError::from(e), AuthError::InvalidToken);
        }
    }

    #[test]
    fn forbidden_carries_the_missing_code() {
        let err: AuthError = AuthzError::Forbidden(codes::DEPARTMENTS_CREATE).into();
        assert_eq!(err.to_string(), "missing permission 'DEPARTMENTS_CREATE'");
    }
}
