use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use registrar_academics::{Course, Department, Enrollment, Student};
use registrar_auth::codes;
use registrar_infra::{RecordStore, UserStore};

use crate::app::dto::DashboardSummary;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::guarded;

pub fn router(services: &AppServices) -> Router {
    Router::new().route(
        "/dashboard",
        guarded(get(dashboard), services.gate(codes::DASHBOARD_VIEW)),
    )
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Record counts per area.
pub async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let store = services.store.as_ref();
    let summary = DashboardSummary {
        departments: RecordStore::<Department>::list(store)
            .await
            .map_err(errors::store_error_to_response)?
            .len(),
        students: RecordStore::<Student>::list(store)
            .await
            .map_err(errors::store_error_to_response)?
            .len(),
        courses: RecordStore::<Course>::list(store)
            .await
            .map_err(errors::store_error_to_response)?
            .len(),
        enrollments: RecordStore::<Enrollment>::list(store)
            .await
            .map_err(errors::store_error_to_response)?
            .len(),
        users: store
            .list_active_users()
            .await
            .map_err(errors::store_error_to_response)?
            .len(),
    };
    Ok(Json(summary).into_response())
}
