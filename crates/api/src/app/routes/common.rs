use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;

use registrar_core::DomainError;

use crate::app::errors;

/// Parse a path identifier, answering 400 on garbage.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

/// Unwrap a JSON body, answering 400 with a JSON error when it does not parse.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(v)| v).map_err(errors::json_rejection)
}
