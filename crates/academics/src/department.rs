use serde::{Deserialize, Serialize};

use registrar_core::{DepartmentId, DomainResult};

use crate::required_text;

/// An academic department. Names are unique across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

/// Mutable fields of a department, as submitted on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDraft {
    pub name: String,
}

impl DepartmentDraft {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: required_text("name", &self.name, 120)?,
        })
    }
}

impl Department {
    pub fn from_draft(id: DepartmentId, draft: DepartmentDraft) -> Self {
        Self { id, name: draft.name }
    }
}
