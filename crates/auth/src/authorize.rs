use std::collections::HashSet;

use thiserror::Error;

use crate::PermissionCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(PermissionCode),
}

/// Check that `required` is among the codes granted to a user.
///
/// - No IO
/// - No panics
/// - Exact code match (there is no wildcard code)
pub fn authorize<'a, I>(granted: I, required: &PermissionCode) -> Result<(), AuthzError>
where
    I: IntoIterator<Item = &'a PermissionCode>,
{
    let granted: HashSet<&str> = granted.into_iter().map(|c| c.as_str()).collect();
    if granted.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.clone()))
    }
}
