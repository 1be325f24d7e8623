use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::get, Router};

use libris_catalog::Author;
use libris_core::AuthorId;
use libris_infra::Repository;

use crate::app::routes::common::EntityPath;
use crate::app::routes::crud;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    crud::resource_router::<Author>("/author").route("/author/:id/books", get(list_books))
}

/// Books owned by one author, through an explicit query on `book.author_id`.
pub async fn list_books(
    Extension(services): Extension<Arc<AppServices>>,
    EntityPath(id): EntityPath<AuthorId>,
) -> axum::response::Response {
    let store = services.store();

    match Repository::<Author>::find(store, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found(errors::AUTHOR_NOT_FOUND),
        Err(e) => return errors::store_error_to_response(e),
    }

    match store.books_by_author(id).await {
        Ok(books) => dto::render_list(StatusCode::OK, &books),
        Err(e) => errors::store_error_to_response(e),
    }
}
