//! `registrar-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod token;

pub use authorize::{AuthzError, authorize};
pub use claims::{ClaimsValidationError, SessionClaims, validate_claims};
pub use error::{AuthError, INVALID_CREDENTIALS};
pub use permissions::{CATALOG, CatalogEntry, PermissionCode, codes};
pub use principal::Identity;
pub use token::{DEFAULT_TOKEN_TTL_HOURS, Hs256Tokens, IssuedToken, TokenError, TokenVerifier};
