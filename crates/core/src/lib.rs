//! `registrar-core`: shared foundation building blocks.
//!
//! This crate contains identifiers and the domain error model (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CourseId, DepartmentId, EnrollmentId, PermissionId, StudentId, UserId};
