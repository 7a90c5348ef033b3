use serde::{Deserialize, Serialize};

use registrar_core::{CourseId, DomainError, DomainResult, EnrollmentId, StudentId};

/// Highest grade a student can be awarded.
pub const MAX_GRADE: f64 = 100.0;

/// A student's enrollment in a course, optionally graded.
///
/// A (student, course) pair is enrolled at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDraft {
    pub student_id: StudentId,
    pub course_id: CourseId,
    #[serde(default)]
    pub grade: Option<f64>,
}

impl EnrollmentDraft {
    pub fn validate(self) -> DomainResult<Self> {
        if let Some(grade) = self.grade {
            if !grade.is_finite() || !(0.0..=MAX_GRADE).contains(&grade) {
                return Err(DomainError::validation(format!(
                    "grade must be between 0 and {MAX_GRADE}"
                )));
            }
        }
        Ok(self)
    }
}

impl Enrollment {
    pub fn from_draft(id: EnrollmentId, draft: EnrollmentDraft) -> Self {
        Self {
            id,
            student_id: draft.student_id,
            course_id: draft.course_id,
            grade: draft.grade,
        }
    }
}
