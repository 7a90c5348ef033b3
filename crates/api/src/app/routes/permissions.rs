use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use registrar_auth::{PermissionCode, codes};
use registrar_core::{DomainError, PermissionId, UserId};
use registrar_infra::{PermissionStore, UserStore};

use crate::app::dto::{CreatePermissionRequest, GrantPermissionRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::guarded;

use super::common::{json_body, parse_id};

const PERMISSION_NAME_MAX_CHARS: usize = 120;

pub fn router(services: &AppServices) -> Router {
    Router::new()
        .route(
            "/",
            guarded(get(list_permissions), services.gate(codes::PERMISSIONS_VIEW))
                .merge(guarded(post(create_permission), services.gate(codes::PERMISSIONS_CREATE))),
        )
        .route(
            "/createpermissiontouser",
            guarded(post(grant_permission), services.gate(codes::PERMISSIONS_ASSIGN)),
        )
        .route(
            "/user/:user_id",
            guarded(get(user_permissions), services.gate(codes::PERMISSIONS_VIEW)),
        )
        .route(
            "/:user_id/:permission_id",
            guarded(delete(revoke_permission), services.gate(codes::PERMISSIONS_ASSIGN)),
        )
}

fn permission_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    if name.chars().count() > PERMISSION_NAME_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "name must be at most {PERMISSION_NAME_MAX_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreatePermissionRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let name = permission_name(&body.name).map_err(errors::domain_error_to_response)?;
    let code = PermissionCode::parse(body.code).map_err(errors::domain_error_to_response)?;

    let permission = services
        .store
        .create_permission(&name, &code)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(permission_id = %permission.id, code = %permission.code, "permission created");
    Ok((StatusCode::CREATED, Json(permission)).into_response())
}

async fn list_permissions(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let permissions = services
        .store
        .list_permissions()
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(permissions).into_response())
}

async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<GrantPermissionRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let grant = services
        .store
        .grant(body.user_id, body.permission_id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user_id = %grant.user_id, permission_id = %grant.permission_id, "permission granted");
    Ok((StatusCode::CREATED, Json(grant)).into_response())
}

async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path((raw_user, raw_permission)): Path<(String, String)>,
) -> ApiResult {
    let user_id: UserId = parse_id(&raw_user)?;
    let permission_id: PermissionId = parse_id(&raw_permission)?;

    services
        .store
        .revoke(user_id, permission_id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(%user_id, %permission_id, "permission revoked");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Permissions held by one active user.
async fn user_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_user): Path<String>,
) -> ApiResult {
    let user_id: UserId = parse_id(&raw_user)?;
    services
        .store
        .get_active_user(user_id)
        .await
        .map_err(errors::store_error_to_response)?;
    let permissions = services
        .store
        .permissions_of(user_id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(permissions).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_names_are_trimmed_and_bounded() {
        assert_eq!(permission_name("  Manage grades ").unwrap(), "Manage grades");
        assert!(permission_name("   ").is_err());
        assert!(permission_name(&"n".repeat(PERMISSION_NAME_MAX_CHARS + 1)).is_err());
    }
}
