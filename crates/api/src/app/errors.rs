//! Error → HTTP response mapping.
//!
//! Every error body has the shape `{"error": <code>, "message": <text>}`;
//! permission denials add `"permission": <code>`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use registrar_auth::{AuthError, INVALID_CREDENTIALS};
use registrar_core::DomainError;
use registrar_infra::StoreError;

/// Handler result: both arms are complete responses.
pub type ApiResult = Result<Response, Response>;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", INVALID_CREDENTIALS)
        }
        AuthError::MissingToken => json_error(StatusCode::FORBIDDEN, "missing_token", err.to_string()),
        AuthError::InvalidToken => json_error(StatusCode::UNAUTHORIZED, "invalid_token", err.to_string()),
        AuthError::Forbidden { permission } => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({
                "error": "forbidden",
                "message": format!("Access denied: missing permission '{permission}'"),
                "permission": permission,
            })),
        )
            .into_response(),
        AuthError::UserNotFound => json_error(StatusCode::NOT_FOUND, "user_not_found", err.to_string()),
        AuthError::Conflict => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::Internal(detail) => internal_error(&detail),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::InvalidReference(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_reference", msg)
        }
        StoreError::Storage(detail) => internal_error(&detail),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

fn internal_error(detail: &str) -> Response {
    tracing::error!(detail, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

#[cfg(test)]
mod tests {
    use registrar_auth::codes;

    use super::*;

    #[test]
    fn auth_errors_map_to_their_status_codes() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::MissingToken, StatusCode::FORBIDDEN),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (
                AuthError::Forbidden {
                    permission: codes::DEPARTMENTS_CREATE,
                },
                StatusCode::FORBIDDEN,
            ),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::Conflict, StatusCode::CONFLICT),
            (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(auth_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_errors_map_to_their_status_codes() {
        let cases = [
            (StoreError::NotFound("course"), StatusCode::NOT_FOUND),
            (StoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (StoreError::InvalidReference("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(store_error_to_response(err).status(), status);
        }
    }
}
