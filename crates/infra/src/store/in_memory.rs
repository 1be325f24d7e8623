use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use libris_catalog::{Author, AuthorFields, Book, BookFields};
use libris_core::{AuthorId, BookId};

use super::{AuthorBooks, Repository, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    authors: BTreeMap<AuthorId, Author>,
    books: BTreeMap<BookId, Book>,
    last_author_id: i64,
    last_book_id: i64,
}

/// In-memory catalog store for tests/dev.
///
/// Identity assignment and foreign-key checks happen under the write lock, so
/// concurrent writers observe the same constraints a relational store would
/// enforce.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

fn next_id<I>(last: &mut i64) -> StoreResult<I>
where
    I: TryFrom<i64>,
    I::Error: core::fmt::Display,
{
    *last += 1;
    I::try_from(*last).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl Repository<Author> for InMemoryCatalogStore {
    async fn find(&self, id: AuthorId) -> StoreResult<Option<Author>> {
        Ok(self.read()?.authors.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Author>> {
        Ok(self.read()?.authors.values().cloned().collect())
    }

    async fn insert(&self, fields: AuthorFields) -> StoreResult<Author> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.last_author_id)?;
        let author = Author::from_fields(id, fields, Utc::now());
        tables.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn update(&self, entity: &Author) -> StoreResult<Author> {
        let mut tables = self.write()?;
        let stored = tables
            .authors
            .get_mut(&entity.id)
            .ok_or(StoreError::NotFound { entity: "author" })?;
        stored.name = entity.name.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: AuthorId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.authors.contains_key(&id) {
            return Err(StoreError::NotFound { entity: "author" });
        }
        if tables.books.values().any(|b| b.author == id) {
            return Err(StoreError::StillReferenced {
                entity: "author",
                dependents: "book",
            });
        }
        tables.authors.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl Repository<Book> for InMemoryCatalogStore {
    async fn find(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        Ok(self.read()?.books.values().cloned().collect())
    }

    async fn insert(&self, fields: BookFields) -> StoreResult<Book> {
        let mut tables = self.write()?;
        if !tables.authors.contains_key(&fields.author) {
            return Err(StoreError::MissingReference { field: "author" });
        }
        let id = next_id(&mut tables.last_book_id)?;
        let book = Book::from_fields(id, fields, Utc::now());
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update(&self, entity: &Book) -> StoreResult<Book> {
        let mut tables = self.write()?;
        if !tables.authors.contains_key(&entity.author) {
            return Err(StoreError::MissingReference { field: "author" });
        }
        let stored = tables
            .books
            .get_mut(&entity.id)
            .ok_or(StoreError::NotFound { entity: "book" })?;
        stored.title = entity.title.clone();
        stored.summary = entity.summary.clone();
        stored.year = entity.year;
        stored.author = entity.author;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> StoreResult<()> {
        self.write()?
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { entity: "book" })
    }
}

#[async_trait]
impl AuthorBooks for InMemoryCatalogStore {
    async fn books_by_author(&self, author: AuthorId) -> StoreResult<Vec<Book>> {
        Ok(self
            .read()?
            .books
            .values()
            .filter(|b| b.author == author)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str) -> AuthorFields {
        AuthorFields { name: name.into() }
    }

    fn book(title: &str, author: AuthorId) -> BookFields {
        BookFields {
            title: title.into(),
            summary: None,
            year: None,
            author,
        }
    }

    #[tokio::test]
    async fn identities_are_sequential_from_one() {
        let store = InMemoryCatalogStore::new();
        let a = Repository::<Author>::insert(&store, author("Orwell")).await.unwrap();
        let b = Repository::<Author>::insert(&store, author("Huxley")).await.unwrap();
        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);

        let found = Repository::<Author>::find(&store, a.id).await.unwrap().unwrap();
        assert_eq!(found, a);
    }

    #[tokio::test]
    async fn book_insert_requires_existing_author() {
        let store = InMemoryCatalogStore::new();
        let missing = AuthorId::new(99).unwrap();
        let err = Repository::<Book>::insert(&store, book("1984", missing)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { field: "author" }));
        assert!(Repository::<Book>::find_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let store = InMemoryCatalogStore::new();
        let a = Repository::<Author>::insert(&store, author("Orwell")).await.unwrap();
        Repository::<Author>::delete(&store, a.id).await.unwrap();
        let b = Repository::<Author>::insert(&store, author("Huxley")).await.unwrap();
        assert_eq!(b.id.get(), 2);
    }

    #[tokio::test]
    async fn author_with_books_cannot_be_deleted() {
        let store = InMemoryCatalogStore::new();
        let a = Repository::<Author>::insert(&store, author("Orwell")).await.unwrap();
        let b = Repository::<Book>::insert(&store, book("1984", a.id)).await.unwrap();

        let err = Repository::<Author>::delete(&store, a.id).await.unwrap_err();
        assert!(matches!(err, StoreError::StillReferenced { .. }));

        Repository::<Book>::delete(&store, b.id).await.unwrap();
        Repository::<Author>::delete(&store, a.id).await.unwrap();
        assert!(Repository::<Author>::find(&store, a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let err = Repository::<Book>::delete(&store, BookId::new(1).unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "book" }));
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_keeps_created_at() {
        let store = InMemoryCatalogStore::new();
        let a = Repository::<Author>::insert(&store, author("Blair")).await.unwrap();
        let mut edited = a.clone();
        edited.name = "Orwell".into();

        let updated = Repository::<Author>::update(&store, &edited).await.unwrap();
        assert_eq!(updated.name, "Orwell");
        assert_eq!(updated.created_at, a.created_at);
        assert!(updated.updated_at >= a.updated_at);
    }

    #[tokio::test]
    async fn books_by_author_filters_on_owner() {
        let store = InMemoryCatalogStore::new();
        let orwell = Repository::<Author>::insert(&store, author("Orwell")).await.unwrap();
        let huxley = Repository::<Author>::insert(&store, author("Huxley")).await.unwrap();
        Repository::<Book>::insert(&store, book("1984", orwell.id)).await.unwrap();
        Repository::<Book>::insert(&store, book("Brave New World", huxley.id)).await.unwrap();
        Repository::<Book>::insert(&store, book("Animal Farm", orwell.id)).await.unwrap();

        let titles: Vec<_> = store
            .books_by_author(orwell.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["1984", "Animal Farm"]);
    }
}
