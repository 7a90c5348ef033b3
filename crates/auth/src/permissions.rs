use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use registrar_core::DomainError;

/// Permission code identifier.
///
/// Codes are stable machine identifiers such as `DEPARTMENTS_CREATE`: an
/// uppercase ASCII letter followed by uppercase letters, digits or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    /// Build a code from a compile-time literal (catalog entries).
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Parse and validate a code supplied at runtime.
    pub fn parse(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into();
        let code = code.trim();
        let mut chars = code.chars();
        match chars.next() {
            Some(c) if c.is_ascii_uppercase() => {}
            _ => {
                return Err(DomainError::validation(
                    "permission code must start with an uppercase letter",
                ));
            }
        }
        if !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            return Err(DomainError::validation(
                "permission code may only contain A-Z, 0-9 and '_'",
            ));
        }
        if code.len() > 64 {
            return Err(DomainError::validation("permission code is longer than 64 characters"));
        }
        Ok(Self(Cow::Owned(code.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for PermissionCode {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for PermissionCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Well-known permission codes guarding the HTTP surface.
pub mod codes {
    use super::PermissionCode;

    pub const DASHBOARD_VIEW: PermissionCode = PermissionCode::from_static("DASHBOARD_VIEW");

    pub const DEPARTMENTS_VIEW: PermissionCode = PermissionCode::from_static("DEPARTMENTS_VIEW");
    pub const DEPARTMENTS_CREATE: PermissionCode = PermissionCode::from_static("DEPARTMENTS_CREATE");
    pub const DEPARTMENTS_UPDATE: PermissionCode = PermissionCode::from_static("DEPARTMENTS_UPDATE");
    pub const DEPARTMENTS_DELETE: PermissionCode = PermissionCode::from_static("DEPARTMENTS_DELETE");

    pub const STUDENTS_VIEW: PermissionCode = PermissionCode::from_static("STUDENTS_VIEW");
    pub const STUDENTS_CREATE: PermissionCode = PermissionCode::from_static("STUDENTS_CREATE");
    pub const STUDENTS_UPDATE: PermissionCode = PermissionCode::from_static("STUDENTS_UPDATE");
    pub const STUDENTS_DELETE: PermissionCode = PermissionCode::from_static("STUDENTS_DELETE");

    pub const COURSES_VIEW: PermissionCode = PermissionCode::from_static("COURSES_VIEW");
    pub const COURSES_CREATE: PermissionCode = PermissionCode::from_static("COURSES_CREATE");
    pub const COURSES_UPDATE: PermissionCode = PermissionCode::from_static("COURSES_UPDATE");
    pub const COURSES_DELETE: PermissionCode = PermissionCode::from_static("COURSES_DELETE");

    pub const ENROLLMENTS_VIEW: PermissionCode = PermissionCode::from_static("ENROLLMENTS_VIEW");
    pub const ENROLLMENTS_CREATE: PermissionCode = PermissionCode::from_static("ENROLLMENTS_CREATE");
    pub const ENROLLMENTS_UPDATE: PermissionCode = PermissionCode::from_static("ENROLLMENTS_UPDATE");
    pub const ENROLLMENTS_DELETE: PermissionCode = PermissionCode::from_static("ENROLLMENTS_DELETE");

    pub const USERS_VIEW: PermissionCode = PermissionCode::from_static("USERS_VIEW");
    pub const USERS_CREATE: PermissionCode = PermissionCode::from_static("USERS_CREATE");
    pub const USERS_UPDATE: PermissionCode = PermissionCode::from_static("USERS_UPDATE");
    pub const USERS_DELETE: PermissionCode = PermissionCode::from_static("USERS_DELETE");

    pub const PERMISSIONS_VIEW: PermissionCode = PermissionCode::from_static("PERMISSIONS_VIEW");
    pub const PERMISSIONS_CREATE: PermissionCode = PermissionCode::from_static("PERMISSIONS_CREATE");
    pub const PERMISSIONS_ASSIGN: PermissionCode = PermissionCode::from_static("PERMISSIONS_ASSIGN");
}

/// A catalog entry: display label plus code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub code: PermissionCode,
}

const fn entry(name: &'static str, code: PermissionCode) -> CatalogEntry {
    CatalogEntry { name, code }
}

/// The built-in permission catalog, upserted at startup.
pub const CATALOG: &[CatalogEntry] = &[
    entry("View dashboard", codes::DASHBOARD_VIEW),
    entry("View departments", codes::DEPARTMENTS_VIEW),
    entry("Create department", codes::DEPARTMENTS_CREATE),
    entry("Update department", codes::DEPARTMENTS_UPDATE),
    entry("Delete department", codes::DEPARTMENTS_DELETE),
    entry("View students", codes::STUDENTS_VIEW),
    entry("Create student", codes::STUDENTS_CREATE),
    entry("Update student", codes::STUDENTS_UPDATE),
    entry("Delete student", codes::STUDENTS_DELETE),
    entry("View courses", codes::COURSES_VIEW),
    entry("Create course", codes::COURSES_CREATE),
    entry("Update course", codes::COURSES_UPDATE),
    entry("Delete course", codes::COURSES_DELETE),
    entry("View enrollments", codes::ENROLLMENTS_VIEW),
    entry("Create enrollment", codes::ENROLLMENTS_CREATE),
    entry("Update enrollment", codes::ENROLLMENTS_UPDATE),
    entry("Delete enrollment", codes::ENROLLMENTS_DELETE),
    entry("View users", codes::USERS_VIEW),
    entry("Create user", codes::USERS_CREATE),
    entry("Update user", codes::USERS_UPDATE),
    entry("Delete user", codes::USERS_DELETE),
    entry("View permissions", codes::PERMISSIONS_VIEW),
    entry("Create permission", codes::PERMISSIONS_CREATE),
    entry("Assign permissions to users", codes::PERMISSIONS_ASSIGN),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn catalog_codes_are_unique_and_valid() {
        let mut seen = HashSet::new();
        for e in CATALOG {
            assert!(seen.insert(e.code.clone()), "duplicate code {}", e.code);
            assert_eq!(PermissionCode::parse(e.code.as_str()).unwrap(), e.code);
        }
    }

    #[test]
    fn parse_rejects_lowercase_and_punctuation() {
        assert!(PermissionCode::parse("departments_create").is_err());
        assert!(PermissionCode::parse("DEPARTMENTS-CREATE").is_err());
        assert!(PermissionCode::parse("_DEPARTMENTS").is_err());
        assert!(PermissionCode::parse("").is_err());
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let code = PermissionCode::parse("  STUDENTS_VIEW ").unwrap();
        assert_eq!(code, codes::STUDENTS_VIEW);
    }

    #[test]
    fn owned_and_static_codes_compare_equal() {
        let parsed = PermissionCode::parse("COURSES_DELETE").unwrap();
        assert_eq!(parsed, codes::COURSES_DELETE);
        assert!(parsed == "COURSES_DELETE");
    }

    proptest! {
        #[test]
        fn well_formed_codes_always_parse(code in "[A-Z][A-Z0-9_]{0,40}") {
            let parsed = PermissionCode::parse(code.clone()).unwrap();
            prop_assert_eq!(parsed.as_str(), code.as_str());
        }
    }
}
