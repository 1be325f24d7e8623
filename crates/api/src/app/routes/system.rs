use axum::http::{Method, StatusCode, Uri};

use crate::app::errors;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn no_route(method: Method, uri: Uri) -> axum::response::Response {
    errors::no_route(&method, uri.path())
}
