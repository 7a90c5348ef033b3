use serde::{Deserialize, Serialize};

use registrar_core::{DepartmentId, DomainError, DomainResult, StudentId};

use crate::required_text;

/// A student belonging to one department. Emails are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub dept_id: DepartmentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    pub name: String,
    pub email: String,
    pub dept_id: DepartmentId,
}

impl StudentDraft {
    /// Validate and normalize: trims fields, lowercases the email.
    pub fn validate(self) -> DomainResult<Self> {
        let name = required_text("name", &self.name, 120)?;
        let email = required_text("email", &self.email, 254)?.to_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(DomainError::validation("email must look like local@domain")),
        }
        if email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email must not contain whitespace"));
        }
        Ok(Self {
            name,
            email,
            dept_id: self.dept_id,
        })
    }
}

impl Student {
    pub fn from_draft(id: StudentId, draft: StudentDraft) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            dept_id: draft.dept_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn draft(email: &str) -> StudentDraft {
        StudentDraft {
            name: "Ahmed".into(),
            email: email.into(),
            dept_id: DepartmentId::new(),
        }
    }

    #[test]
    fn email_is_normalized() {
        let d = draft(" Student1@Example.COM ").validate().unwrap();
        assert_eq!(d.email, "student1@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "no-at-sign", "@example.com", "student@", "a@b@c", "a b@example.com"] {
            assert!(draft(bad).validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn wire_format_uses_dept_id() {
        let d = draft("s@example.com");
        let json = serde_json::to_value(&d).unwrap();
        assert!(json.get("deptId").is_some());
    }

    proptest! {
        #[test]
        fn well_formed_emails_validate(local in "[a-z0-9.]{1,20}", domain in "[a-z0-9]{1,20}\\.[a-z]{2,6}") {
            let email = format!("{local}@{domain}");
            let d = draft(&email).validate().unwrap();
            prop_assert_eq!(d.email, email);
        }
    }
}
