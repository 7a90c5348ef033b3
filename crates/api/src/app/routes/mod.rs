use axum::{Router, routing::post};

use registrar_academics::{Course, Department, Enrollment, Student};

use crate::app::services::AppServices;

pub mod common;
pub mod permissions;
pub mod records;
pub mod system;
pub mod users;

use records::AreaCodes;

/// Endpoints reachable without a token.
pub fn public() -> Router {
    Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
}

/// Router for all authenticated endpoints. Each route carries its own permission guard.
pub fn protected(services: &AppServices) -> Router {
    Router::new()
        .merge(system::router(services))
        .nest("/users", users::router(services))
        .nest("/permissions", permissions::router(services))
        .nest("/departments", records::router::<Department>(services, AreaCodes::DEPARTMENTS))
        .nest("/students", records::router::<Student>(services, AreaCodes::STUDENTS))
        .nest("/courses", records::router::<Course>(services, AreaCodes::COURSES))
        .nest("/enrollments", records::router::<Enrollment>(services, AreaCodes::ENROLLMENTS))
}
