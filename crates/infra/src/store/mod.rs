//! Entity persistence.
//!
//! `Repository<R>` is the generic persist/flush surface used by the CRUD
//! handlers. Every write is a single statement: the store assigns identities
//! and timestamps and enforces referential integrity between books and
//! authors.

use async_trait::async_trait;
use thiserror::Error;

use libris_catalog::{Author, Book, FieldsOf, Resource};
use libris_core::AuthorId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The row to update or delete does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A written row references a row that does not exist.
    #[error("referenced {field} does not exist")]
    MissingReference { field: &'static str },

    /// A delete was refused because other rows still reference the target.
    #[error("{entity} is still referenced by {dependents}")]
    StillReferenced {
        entity: &'static str,
        dependents: &'static str,
    },

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Generic CRUD persistence for one resource type.
#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    async fn find(&self, id: R::Id) -> StoreResult<Option<R>>;

    /// All rows, in primary-key order.
    async fn find_all(&self) -> StoreResult<Vec<R>>;

    /// Insert a new row; the store assigns its identity.
    async fn insert(&self, fields: FieldsOf<R>) -> StoreResult<R>;

    /// Overwrite the mutable fields of an existing row and refresh `updated_at`.
    async fn update(&self, entity: &R) -> StoreResult<R>;

    async fn delete(&self, id: R::Id) -> StoreResult<()>;
}

/// Navigation from an author to the books it owns.
#[async_trait]
pub trait AuthorBooks: Send + Sync {
    /// Books whose `author` is `author`, in primary-key order.
    async fn books_by_author(&self, author: AuthorId) -> StoreResult<Vec<Book>>;
}

/// Everything the HTTP layer needs from a store.
pub trait CatalogStore: Repository<Author> + Repository<Book> + AuthorBooks {}

impl<T> CatalogStore for T where T: Repository<Author> + Repository<Book> + AuthorBooks {}
