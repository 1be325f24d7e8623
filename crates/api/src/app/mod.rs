//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and wiring
//! - `routes/`: HTTP routes + handlers (generic CRUD plus one file per resource)
//! - `dto.rs`: request body parsing and JSON rendering helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: services::AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .fallback(routes::system::no_route)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(Arc::new(services))),
        )
}
