//! Persistence seam for users, permissions, grants and academic records.
//!
//! Two backends implement the traits here:
//! - [`InMemoryStore`]: `RwLock`-guarded tables for dev and tests
//! - [`PostgresStore`]: sqlx-backed, schema in `migrations/0001_schema.sql`
//!
//! Both enforce the same constraints (unique usernames, codes, grants,
//! department names, student emails and enrollments; restrict-on-delete
//! foreign keys) and report violations with the same [`StoreError`] variants.

pub mod in_memory;
pub mod postgres;

use core::fmt::Display;
use core::hash::Hash;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use registrar_academics::{
    Course, CourseDraft, Department, DepartmentDraft, Enrollment, EnrollmentDraft, Student,
    StudentDraft,
};
use registrar_auth::PermissionCode;
use registrar_core::{
    CourseId, DepartmentId, DomainResult, EnrollmentId, PermissionId, StudentId, UserId,
};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub(crate) mod messages {
    pub const USERNAME_TAKEN: &str = "Username already exists";
    pub const PERMISSION_CODE_TAKEN: &str = "permission code already exists";
    pub const ALREADY_GRANTED: &str = "permission is already granted to this user";
    pub const DEPARTMENT_NAME_TAKEN: &str = "department name already exists";
    pub const STUDENT_EMAIL_TAKEN: &str = "student email already exists";
    pub const ALREADY_ENROLLED: &str = "student is already enrolled in this course";
    pub const MISSING_DEPARTMENT: &str = "department does not exist";
    pub const MISSING_STUDENT: &str = "student does not exist";
    pub const MISSING_COURSE: &str = "course does not exist";

    pub fn still_referenced(kind: &str) -> String {
        format!("{kind} is still referenced by other records")
    }
}

/// A stored user account. `exists == false` marks a soft-deleted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub exists: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields of a user that can change after registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub name: String,
    pub code: PermissionCode,
}

/// One user ↔ permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new active user. Usernames held by soft-deleted users stay taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Fetch an active user; soft-deleted users are `NotFound`.
    async fn get_active_user(&self, id: UserId) -> Result<UserRecord, StoreError>;

    async fn list_active_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<UserRecord, StoreError>;

    /// Flip `exists` to false. Grants are kept.
    async fn soft_delete_user(&self, id: UserId) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait PermissionStore: Send + Sync {
    async fn create_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError>;

    /// Insert the permission unless one with `code` already exists; returns the stored entry.
    async fn ensure_permission(
        &self,
        name: &str,
        code: &PermissionCode,
    ) -> Result<PermissionRecord, StoreError>;

    /// All permissions ordered by code.
    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, StoreError>;

    /// Grant a permission to an active user.
    async fn grant(&self, user_id: UserId, permission_id: PermissionId) -> Result<Grant, StoreError>;

    async fn revoke(&self, user_id: UserId, permission_id: PermissionId) -> Result<(), StoreError>;

    /// Permission records granted to a user (active or not), ordered by code.
    async fn permissions_of(&self, user_id: UserId) -> Result<Vec<PermissionRecord>, StoreError>;

    /// Codes granted to an active user, read fresh on every call.
    ///
    /// Missing and soft-deleted users both yield `NotFound("user")`.
    async fn granted_codes(&self, user_id: UserId) -> Result<Vec<PermissionCode>, StoreError>;
}

/// A CRUD-able academic record.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Ord + Hash + Display + Send + Sync + 'static;
    type Draft: Send + 'static;

    /// Lowercase noun used in error messages.
    const KIND: &'static str;

    fn new_id() -> Self::Id;
    fn id(&self) -> Self::Id;
    fn build(id: Self::Id, draft: Self::Draft) -> Self;

    /// Field validation and normalization, before any store access.
    fn validate(draft: Self::Draft) -> DomainResult<Self::Draft>;
}

/// Generic record persistence. Drafts are expected to be validated already.
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// All records in creation order.
    async fn list(&self) -> Result<Vec<R>, StoreError>;
    async fn get(&self, id: R::Id) -> Result<R, StoreError>;
    async fn insert(&self, draft: R::Draft) -> Result<R, StoreError>;
    /// Replace every mutable field of an existing record.
    async fn update(&self, id: R::Id, draft: R::Draft) -> Result<R, StoreError>;
    async fn delete(&self, id: R::Id) -> Result<(), StoreError>;
}

/// Everything the application needs from a backend.
pub trait Store:
    UserStore
    + PermissionStore
    + RecordStore<Department>
    + RecordStore<Student>
    + RecordStore<Course>
    + RecordStore<Enrollment>
{
}

impl<T> Store for T where
    T: UserStore
        + PermissionStore
        + RecordStore<Department>
        + RecordStore<Student>
        + RecordStore<Course>
        + RecordStore<Enrollment>
        + ?Sized
{
}

macro_rules! impl_record {
    ($record:ty, $id:ty, $draft:ty, $kind:literal) => {
        impl Record for $record {
            type Id = $id;
            type Draft = $draft;

            const KIND: &'static str = $kind;

            fn new_id() -> Self::Id {
                <$id>::new()
            }

            fn id(&self) -> Self::Id {
                self.id
            }

            fn build(id: Self::Id, draft: Self::Draft) -> Self {
                <$record>::from_draft(id, draft)
            }

            fn validate(draft: Self::Draft) -> DomainResult<Self::Draft> {
                draft.validate()
            }
        }
    };
}

impl_record!(Department, DepartmentId, DepartmentDraft, "department");
impl_record!(Student, StudentId, StudentDraft, "student");
impl_record!(Course, CourseId, CourseDraft, "course");
impl_record!(Enrollment, EnrollmentId, EnrollmentDraft, "enrollment");
