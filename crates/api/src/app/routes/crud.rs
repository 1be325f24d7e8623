//! Generic create/read/update/delete handlers shared by every resource.
//!
//! A resource plugs in through `libris_catalog::Resource` (entity, form, view)
//! and a `Repository` implementation on the catalog store.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use libris_catalog::{submit, Resource};
use libris_infra::{CatalogStore, Repository, StoreError};

use crate::app::routes::common::EntityPath;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// The five CRUD routes of `R`, mounted under `base` (e.g. `/book`).
pub fn resource_router<R>(base: &str) -> Router
where
    R: Resource,
    R::Id: core::str::FromStr,
    dyn CatalogStore: Repository<R>,
{
    Router::new()
        .route(base, post(create::<R>).get(list::<R>))
        .route(
            &format!("{base}/:id"),
            get(read::<R>).put(update::<R>).delete(delete::<R>),
        )
}

pub async fn create<R>(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response
where
    R: Resource,
    dyn CatalogStore: Repository<R>,
{
    let body = match dto::body_object(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let fields = match submit::<R::Form>(Default::default(), &body, true) {
        Ok(f) => f,
        Err(e) => return errors::validation_error(e),
    };

    match Repository::<R>::insert(services.store(), fields).await {
        Ok(entity) => {
            tracing::info!(resource = R::LABEL, id = %entity.id(), "created");
            dto::render(StatusCode::CREATED, &entity)
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn read<R>(
    Extension(services): Extension<Arc<AppServices>>,
    EntityPath(id): EntityPath<R::Id>,
) -> axum::response::Response
where
    R: Resource,
    R::Id: core::str::FromStr,
    dyn CatalogStore: Repository<R>,
{
    match Repository::<R>::find(services.store(), id).await {
        Ok(Some(entity)) => dto::render(StatusCode::OK, &entity),
        Ok(None) => errors::not_found(errors::ENTITY_NOT_FOUND),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Every instance in primary-key order; an empty store is reported as 404.
pub async fn list<R>(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response
where
    R: Resource,
    dyn CatalogStore: Repository<R>,
{
    match Repository::<R>::find_all(services.store()).await {
        Ok(entities) if entities.is_empty() => errors::not_found(R::EMPTY_LIST_MESSAGE),
        Ok(entities) => dto::render_list(StatusCode::OK, &entities),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Partial update: fields absent from the body keep their stored values.
pub async fn update<R>(
    Extension(services): Extension<Arc<AppServices>>,
    EntityPath(id): EntityPath<R::Id>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response
where
    R: Resource,
    R::Id: core::str::FromStr,
    dyn CatalogStore: Repository<R>,
{
    let store = services.store();

    let mut entity = match Repository::<R>::find(store, id).await {
        Ok(Some(entity)) => entity,
        Ok(None) => return errors::not_found(errors::ENTITY_NOT_FOUND),
        Err(e) => return errors::store_error_to_response(e),
    };

    let body = match dto::body_object(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let fields = match submit::<R::Form>(entity.form_data(), &body, false) {
        Ok(f) => f,
        Err(e) => return errors::validation_error(e),
    };
    entity.apply(fields);

    match Repository::<R>::update(store, &entity).await {
        Ok(updated) => {
            tracing::info!(resource = R::LABEL, id = %id, "updated");
            dto::render(StatusCode::OK, &updated)
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete<R>(
    Extension(services): Extension<Arc<AppServices>>,
    EntityPath(id): EntityPath<R::Id>,
) -> axum::response::Response
where
    R: Resource,
    R::Id: core::str::FromStr,
    dyn CatalogStore: Repository<R>,
{
    match Repository::<R>::delete(services.store(), id).await {
        Ok(()) => {
            tracing::info!(resource = R::LABEL, id = %id, "deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            if matches!(e, StoreError::StillReferenced { .. }) {
                tracing::warn!(resource = R::LABEL, id = %id, "delete refused: {e}");
            }
            errors::store_error_to_response(e)
        }
    }
}
