//! Academic records: departments, students, courses and enrollments.
//!
//! This crate holds the record shapes and their validation rules, implemented
//! purely as deterministic logic (no IO, no HTTP, no storage). Uniqueness and
//! referential integrity are the store's job.

pub mod course;
pub mod department;
pub mod enrollment;
pub mod student;

pub use course::{Course, CourseDraft, MAX_CREDITS};
pub use department::{Department, DepartmentDraft};
pub use enrollment::{Enrollment, EnrollmentDraft, MAX_GRADE};
pub use student::{Student, StudentDraft};

use registrar_core::{DomainError, DomainResult};

/// Trim `value` and reject it when empty or longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}
