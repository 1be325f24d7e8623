//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (foreign key violation) | `23503` | `MissingReference` | Book written with an unknown author |
//! | Database (foreign key violation) | `23503` | `StillReferenced` | Author deleted while books reference it |
//! | Any other | Any other | `Backend` | Connection failures, constraint bugs, etc. |
//!
//! Every write is one statement; `RETURNING` hands back the stored row so the
//! caller sees store-assigned ids and timestamps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;

use libris_catalog::{Author, AuthorFields, Book, BookFields};
use libris_core::{AuthorId, BookId};

use super::{AuthorBooks, Repository, StoreError, StoreResult};

/// Schema created on startup. `book.author_id` has no cascade: deleting an
/// author that still owns books fails with a foreign key violation.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS book (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    summary VARCHAR(255) NULL,
    year INTEGER NULL,
    author_id BIGINT NOT NULL REFERENCES author (id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS book_author_id_idx ON book (author_id);
"#;

const AUTHOR_COLUMNS: &str = "id, name, created_at, updated_at";
const BOOK_COLUMNS: &str = "id, title, summary, year, author_id, created_at, updated_at";

/// Postgres-backed catalog store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e, None))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e, None))?;
        Ok(())
    }

    #[instrument(skip(self), fields(author_id = %id), err)]
    async fn find_author(&self, id: AuthorId) -> StoreResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM author WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_author", e, None))?;
        row.map(Author::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM author ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_authors", e, None))?;
        rows.into_iter().map(Author::try_from).collect()
    }

    #[instrument(skip(self, values), err)]
    async fn insert_author(&self, values: AuthorFields) -> StoreResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "INSERT INTO author (name) VALUES ($1) RETURNING {AUTHOR_COLUMNS}"
        ))
        .bind(&values.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_author", e, None))?;
        Author::try_from(row)
    }

    #[instrument(skip(self, author), fields(author_id = %author.id), err)]
    async fn update_author(&self, author: &Author) -> StoreResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "UPDATE author SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {AUTHOR_COLUMNS}"
        ))
        .bind(author.id.get())
        .bind(&author.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_author", e, None))?;
        row.map(Author::try_from)
            .transpose()?
            .ok_or(StoreError::NotFound { entity: "author" })
    }

    #[instrument(skip(self), fields(author_id = %id), err)]
    async fn delete_author(&self, id: AuthorId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM author WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_sqlx_error(
                    "delete_author",
                    e,
                    Some(StoreError::StillReferenced {
                        entity: "author",
                        dependents: "book",
                    }),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "author" });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn find_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_book", e, None))?;
        row.map(Book::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!("SELECT {BOOK_COLUMNS} FROM book ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_books", e, None))?;
        rows.into_iter().map(Book::try_from).collect()
    }

    #[instrument(skip(self, values), fields(author_id = %values.author), err)]
    async fn insert_book(&self, values: BookFields) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "INSERT INTO book (title, summary, year, author_id) VALUES ($1, $2, $3, $4) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&values.title)
        .bind(&values.summary)
        .bind(values.year)
        .bind(values.author.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_book", e, Some(StoreError::MissingReference { field: "author" })))?;
        Book::try_from(row)
    }

    #[instrument(skip(self, book), fields(book_id = %book.id), err)]
    async fn update_book(&self, book: &Book) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE book SET title = $2, summary = $3, year = $4, author_id = $5, updated_at = NOW() \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.id.get())
        .bind(&book.title)
        .bind(&book.summary)
        .bind(book.year)
        .bind(book.author.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_book", e, Some(StoreError::MissingReference { field: "author" })))?;
        row.map(Book::try_from)
            .transpose()?
            .ok_or(StoreError::NotFound { entity: "book" })
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn delete_book(&self, id: BookId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM book WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_book", e, None))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "book" });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(author_id = %author), err)]
    async fn list_books_of(&self, author: AuthorId) -> StoreResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book WHERE author_id = $1 ORDER BY id ASC"
        ))
        .bind(author.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_books_of", e, None))?;
        rows.into_iter().map(Book::try_from).collect()
    }
}

#[async_trait]
impl Repository<Author> for PostgresCatalogStore {
    async fn find(&self, id: AuthorId) -> StoreResult<Option<Author>> {
        self.find_author(id).await
    }

    async fn find_all(&self) -> StoreResult<Vec<Author>> {
        self.list_authors().await
    }

    async fn insert(&self, fields: AuthorFields) -> StoreResult<Author> {
        self.insert_author(fields).await
    }

    async fn update(&self, entity: &Author) -> StoreResult<Author> {
        self.update_author(entity).await
    }

    async fn delete(&self, id: AuthorId) -> StoreResult<()> {
        self.delete_author(id).await
    }
}

#[async_trait]
impl Repository<Book> for PostgresCatalogStore {
    async fn find(&self, id: BookId) -> StoreResult<Option<Book>> {
        self.find_book(id).await
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        self.list_books().await
    }

    async fn insert(&self, fields: BookFields) -> StoreResult<Book> {
        self.insert_book(fields).await
    }

    async fn update(&self, entity: &Book) -> StoreResult<Book> {
        self.update_book(entity).await
    }

    async fn delete(&self, id: BookId) -> StoreResult<()> {
        self.delete_book(id).await
    }
}

#[async_trait]
impl AuthorBooks for PostgresCatalogStore {
    async fn books_by_author(&self, author: AuthorId) -> StoreResult<Vec<Book>> {
        self.list_books_of(author).await
    }
}

/// Map a SQLx error. `foreign_key` is what a `23503` violation means for the
/// statement at hand; without it the violation is a backend failure.
fn map_sqlx_error(operation: &str, err: sqlx::Error, foreign_key: Option<StoreError>) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23503") {
                if let Some(mapped) = foreign_key {
                    return mapped;
                }
            }
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        sqlx::Error::PoolTimedOut => StoreError::Backend(format!("connection pool timed out in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct AuthorRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AuthorRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AuthorRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<AuthorRow> for Author {
    type Error = StoreError;

    fn try_from(row: AuthorRow) -> Result<Self, Self::Error> {
        Ok(Author {
            id: AuthorId::new(row.id).map_err(|e| StoreError::Backend(e.to_string()))?,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct BookRow {
    id: i64,
    title: String,
    summary: Option<String>,
    year: Option<i32>,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for BookRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BookRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            year: row.try_get("year")?,
            author_id: row.try_get("author_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: BookId::new(row.id).map_err(|e| StoreError::Backend(e.to_string()))?,
            title: row.title,
            summary: row.summary,
            year: row.year,
            author: AuthorId::new(row.author_id).map_err(|e| StoreError::Backend(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_are_backend_errors() {
        let err = map_sqlx_error(
            "insert_book",
            sqlx::Error::PoolTimedOut,
            Some(StoreError::MissingReference { field: "author" }),
        );
        match err {
            StoreError::Backend(msg) => assert!(msg.contains("insert_book")),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn rows_with_non_positive_ids_are_rejected() {
        let row = AuthorRow {
            id: 0,
            name: "Orwell".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(Author::try_from(row), Err(StoreError::Backend(_))));
    }

    #[test]
    fn schema_keeps_books_bound_to_authors() {
        assert!(SCHEMA.contains("author_id BIGINT NOT NULL REFERENCES author (id)"));
        assert!(!SCHEMA.to_uppercase().contains("ON DELETE CASCADE"));
    }
}
