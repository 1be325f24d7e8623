use axum::Router;

pub mod authors;
pub mod books;
pub mod common;
pub mod crud;
pub mod system;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(authors::router())
        .merge(books::router())
}
