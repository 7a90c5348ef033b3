//! Per-route permission guard.
//!
//! Runs after [`crate::middleware::auth_middleware`] and before the handler.
//! Each check reads the caller's granted codes from the store, so grants and
//! revocations take effect on the next request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};

use registrar_auth::{AuthError, Identity, PermissionCode};
use registrar_infra::{IdentityService, Store};

use crate::app::errors::auth_error_to_response;

/// A required permission code plus what is needed to check it.
#[derive(Clone)]
pub struct PermissionGate {
    identity: Arc<IdentityService<dyn Store>>,
    required: PermissionCode,
}

impl PermissionGate {
    pub fn new(identity: Arc<IdentityService<dyn Store>>, required: PermissionCode) -> Self {
        Self { identity, required }
    }
}

pub async fn require_permission(
    State(gate): State<PermissionGate>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(identity) = req.extensions().get::<Identity>().cloned() else {
        // Mounted without the auth middleware in front of it.
        return Err(auth_error_to_response(AuthError::MissingToken));
    };

    gate.identity
        .authorize(&identity, &gate.required)
        .await
        .map_err(auth_error_to_response)?;

    Ok(next.run(req).await)
}

/// Put `route` behind `gate`. Only the methods registered on `route` are guarded.
pub fn guarded<S>(route: MethodRouter<S>, gate: PermissionGate) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(gate, require_permission))
}
