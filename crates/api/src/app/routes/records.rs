//! CRUD routes shared by the four academic areas.
//!
//! Each area is a [`Record`] type; the handlers here are generic over it and
//! reach the matching [`RecordStore`] through the application store.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::{Serialize, de::DeserializeOwned};

use registrar_auth::{PermissionCode, codes};
use registrar_core::DomainError;
use registrar_infra::{Record, RecordStore, Store};

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::guarded;

use super::common::{json_body, parse_id};

/// Permission codes guarding one area, one per HTTP verb family.
pub struct AreaCodes {
    pub view: PermissionCode,
    pub create: PermissionCode,
    pub update: PermissionCode,
    pub delete: PermissionCode,
}

impl AreaCodes {
    pub const DEPARTMENTS: Self = Self {
        view: codes::DEPARTMENTS_VIEW,
        create: codes::DEPARTMENTS_CREATE,
        update: codes::DEPARTMENTS_UPDATE,
        delete: codes::DEPARTMENTS_DELETE,
    };

    pub const STUDENTS: Self = Self {
        view: codes::STUDENTS_VIEW,
        create: codes::STUDENTS_CREATE,
        update: codes::STUDENTS_UPDATE,
        delete: codes::STUDENTS_DELETE,
    };

    pub const COURSES: Self = Self {
        view: codes::COURSES_VIEW,
        create: codes::COURSES_CREATE,
        update: codes::COURSES_UPDATE,
        delete: codes::COURSES_DELETE,
    };

    pub const ENROLLMENTS: Self = Self {
        view: codes::ENROLLMENTS_VIEW,
        create: codes::ENROLLMENTS_CREATE,
        update: codes::ENROLLMENTS_UPDATE,
        delete: codes::ENROLLMENTS_DELETE,
    };
}

pub fn router<R>(services: &AppServices, area: AreaCodes) -> Router
where
    R: Record + Serialize,
    R::Draft: DeserializeOwned,
    R::Id: FromStr<Err = DomainError>,
    dyn Store: RecordStore<R>,
{
    let AreaCodes {
        view,
        create,
        update,
        delete: remove,
    } = area;

    Router::new()
        .route(
            "/",
            guarded(get(list::<R>), services.gate(view.clone()))
                .merge(guarded(post(create_record::<R>), services.gate(create))),
        )
        .route(
            "/:id",
            guarded(get(fetch::<R>), services.gate(view))
                .merge(guarded(put(update_record::<R>), services.gate(update)))
                .merge(guarded(delete(delete_record::<R>), services.gate(remove))),
        )
}

async fn list<R>(Extension(services): Extension<Arc<AppServices>>) -> ApiResult
where
    R: Record + Serialize,
    dyn Store: RecordStore<R>,
{
    let records = RecordStore::<R>::list(services.store.as_ref())
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(records).into_response())
}

async fn fetch<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
) -> ApiResult
where
    R: Record + Serialize,
    R::Id: FromStr<Err = DomainError>,
    dyn Store: RecordStore<R>,
{
    let id: R::Id = parse_id(&raw_id)?;
    let record = RecordStore::<R>::get(services.store.as_ref(), id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(record).into_response())
}

async fn create_record<R>(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<R::Draft>, JsonRejection>,
) -> ApiResult
where
    R: Record + Serialize,
    R::Draft: DeserializeOwned,
    dyn Store: RecordStore<R>,
{
    let draft = R::validate(json_body(body)?).map_err(errors::domain_error_to_response)?;
    let record = RecordStore::<R>::insert(services.store.as_ref(), draft)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(kind = R::KIND, id = %record.id(), "record created");
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn update_record<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
    body: Result<Json<R::Draft>, JsonRejection>,
) -> ApiResult
where
    R: Record + Serialize,
    R::Draft: DeserializeOwned,
    R::Id: FromStr<Err = DomainError>,
    dyn Store: RecordStore<R>,
{
    let id: R::Id = parse_id(&raw_id)?;
    let draft = R::validate(json_body(body)?).map_err(errors::domain_error_to_response)?;
    let record = RecordStore::<R>::update(services.store.as_ref(), id, draft)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(kind = R::KIND, id = %id, "record updated");
    Ok(Json(record).into_response())
}

async fn delete_record<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw_id): Path<String>,
) -> ApiResult
where
    R: Record,
    R::Id: FromStr<Err = DomainError>,
    dyn Store: RecordStore<R>,
{
    let id: R::Id = parse_id(&raw_id)?;
    RecordStore::<R>::delete(services.store.as_ref(), id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(kind = R::KIND, id = %id, "record deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
