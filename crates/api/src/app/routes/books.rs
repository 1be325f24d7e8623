use axum::Router;

use libris_catalog::Book;

use crate::app::routes::crud;

pub fn router() -> Router {
    crud::resource_router::<Book>("/book")
}
