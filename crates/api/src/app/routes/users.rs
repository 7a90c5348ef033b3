use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use registrar_auth::{Identity, codes};
use registrar_core::UserId;
use registrar_infra::{PermissionStore, UserStore};

use crate::app::dto::{
    CredentialsRequest, LoginResponse, LoginUser, MeResponse, RegisterResponse, UpdateUserRequest,
    user_view,
};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::guarded;

use super::common::{json_body, parse_id};

/// Authenticated `/users` routes. Registration and login live in [`super::public`].
pub fn router(services: &AppServices) -> Router {
    Router::new()
        .route(
            "/",
            guarded(get(list_users), services.gate(codes::USERS_VIEW))
                .merge(guarded(post(create_user), services.gate(codes::USERS_CREATE))),
        )
        .route("/me", get(me))
        .route(
            "/:id",
            guarded(get(get_user), services.gate(codes::USERS_VIEW))
                .merge(guarded(put(update_user), services.gate(codes::USERS_UPDATE)))
                .merge(guarded(delete(delete_user), services.gate(codes::USERS_DELETE))),
        )
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let user = services
        .identity
        .register(&body.username, &body.password)
        .await
        .map_err(errors::auth_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully",
            user_id: user.id,
        }),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let outcome = services
        .identity
        .login(&body.username, &body.password)
        .await
        .map_err(errors::auth_error_to_response)?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: outcome.token,
        user: LoginUser {
            id: outcome.user.id,
            username: outcome.user.username,
            permissions: outcome.permissions,
        },
    })
    .into_response())
}

/// Admin-side account creation. Same rules as self-registration.
async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(body)?;
    let user = services
        .identity
        .register(&body.username, &body.password)
        .await
        .map_err(errors::auth_error_to_response)?;

    Ok((StatusCode::CREATED, Json(user_view(user, Vec::new()))).into_response())
}

async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let users = services
        .store
        .list_active_users()
        .await
        .map_err(errors::store_error_to_response)?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        let permissions = services
            .store
            .permissions_of(user.id)
            .await
            .map_err(errors::store_error_to_response)?;
        views.push(user_view(user, permissions));
    }
    Ok(Json(views).into_response())
}

async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let id: UserId = parse_id(&raw_id)?;
    let user = services
        .store
        .get_active_user(id)
        .await
        .map_err(errors::store_error_to_response)?;
    let permissions = services
        .store
        .permissions_of(id)
        .await
        .map_err(errors::store_error_to_response)?;

    Ok(Json(user_view(user, permissions)).into_response())
}

async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult {
    let id: UserId = parse_id(&raw_id)?;
    let body = json_body(body)?;
    if body.username.is_none() && body.password.is_none() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "nothing to update",
        ));
    }

    let user = services
        .identity
        .update_user(id, body.username.as_deref(), body.password.as_deref())
        .await
        .map_err(errors::auth_error_to_response)?;
    let permissions = services
        .store
        .permissions_of(id)
        .await
        .map_err(errors::store_error_to_response)?;

    Ok(Json(user_view(user, permissions)).into_response())
}

/// Soft delete. The account can no longer log in and its tokens stop working.
async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let id: UserId = parse_id(&raw_id)?;
    services
        .store
        .soft_delete_user(id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user_id = %id, "user soft-deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The caller's own identity and current permissions.
async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> ApiResult {
    let permissions = services
        .identity
        .granted_codes(identity.user_id)
        .await
        .map_err(errors::auth_error_to_response)?;

    Ok(Json(MeResponse {
        user_id: identity.user_id,
        username: identity.username,
        permissions,
    })
    .into_response())
}
