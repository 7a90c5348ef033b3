use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use registrar_auth::PermissionCode;
use registrar_core::{PermissionId, UserId};
use registrar_infra::{PermissionRecord, UserRecord};

// -------------------------
// Request DTOs
// -------------------------

/// Missing fields deserialize as empty strings so that validation, not the
/// JSON extractor, reports them.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: UserId,
    pub username: String,
    pub permissions: Vec<PermissionCode>,
}

/// A user as listed by the admin endpoints. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: UserId,
    pub username: String,
    pub permissions: Vec<PermissionCode>,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub departments: usize,
    pub students: usize,
    pub courses: usize,
    pub enrollments: usize,
    pub users: usize,
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn user_view(user: UserRecord, permissions: Vec<PermissionRecord>) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        permissions,
    }
}
