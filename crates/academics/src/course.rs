use serde::{Deserialize, Serialize};

use registrar_core::{CourseId, DepartmentId, DomainError, DomainResult};

use crate::required_text;

/// Upper bound on credit hours for a single course.
pub const MAX_CREDITS: i32 = 30;

/// A course offered by a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub credits: i32,
    pub dept_id: DepartmentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub credits: i32,
    pub dept_id: DepartmentId,
}

impl CourseDraft {
    pub fn validate(self) -> DomainResult<Self> {
        let title = required_text("title", &self.title, 200)?;
        if !(1..=MAX_CREDITS).contains(&self.credits) {
            return Err(DomainError::validation(format!(
                "credits must be between 1 and {MAX_CREDITS}"
            )));
        }
        Ok(Self { title, ..self })
    }
}

impl Course {
    pub fn from_draft(id: CourseId, draft: CourseDraft) -> Self {
        Self {
            id,
            title: draft.title,
            credits: draft.credits,
            dept_id: draft.dept_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn draft(credits: i32) -> CourseDraft {
        CourseDraft {
            title: "Databases".into(),
            credits,
            dept_id: DepartmentId::new(),
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        let d = CourseDraft { title: " ".into(), ..draft(3) };
        assert!(d.validate().is_err());
    }

    proptest! {
        #[test]
        fn credits_inside_range_are_accepted(credits in 1i32..=MAX_CREDITS) {
            prop_assert!(draft(credits).validate().is_ok());
        }

        #[test]
        fn credits_outside_range_are_rejected(credits in prop_oneof![i32::MIN..1i32, (MAX_CREDITS + 1)..i32::MAX]) {
            prop_assert!(draft(credits).validate().is_err());
        }
    }
}
