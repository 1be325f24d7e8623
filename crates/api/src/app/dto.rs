use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Map, Value};

use libris_catalog::Resource;

use crate::app::errors;

// -------------------------
// Request bodies
// -------------------------

/// Unwrap a JSON request body that must be an object.
pub fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, axum::response::Response> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            "request body must be a JSON object",
        )),
        Err(rejection) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            rejection.body_text(),
        )),
    }
}

// -------------------------
// JSON rendering helpers
// -------------------------

pub fn render<R: Resource>(status: StatusCode, entity: &R) -> axum::response::Response {
    (status, Json(entity.view())).into_response()
}

pub fn render_list<R: Resource>(status: StatusCode, entities: &[R]) -> axum::response::Response {
    let views = entities.iter().map(Resource::view).collect::<Vec<_>>();
    (status, Json(views)).into_response()
}
