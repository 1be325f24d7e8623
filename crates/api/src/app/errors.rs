use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use libris_catalog::form::NOT_VALID;
use libris_catalog::FormErrors;
use libris_infra::StoreError;

pub const ENTITY_NOT_FOUND: &str = "Entity not found";
pub const AUTHOR_NOT_FOUND: &str = "Author not found";

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound { .. } => not_found(ENTITY_NOT_FOUND),
        StoreError::MissingReference { field } => validation_error(FormErrors::single(field, NOT_VALID)),
        StoreError::StillReferenced { entity, dependents } => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("{entity} is still referenced by {dependents} records"),
        ),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage backend failure")
        }
    }
}

/// 422 with the structured per-field errors.
pub fn validation_error(errors: FormErrors) -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "errors": errors,
        })),
    )
        .into_response()
}

/// 404 with a plain-text message.
pub fn not_found(message: &'static str) -> axum::response::Response {
    (StatusCode::NOT_FOUND, message).into_response()
}

/// 404 for paths no route matches (including non-numeric identifiers).
pub fn no_route(method: &Method, path: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        format!("No route found for \"{method} {path}\""),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
