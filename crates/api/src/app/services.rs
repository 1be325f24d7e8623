use std::sync::Arc;

use libris_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreConfig, StoreError};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn CatalogStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Services backed by a fresh in-memory store (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }

    pub fn store(&self) -> &(dyn CatalogStore + 'static) {
        &*self.store
    }
}

/// Wire the store selected by configuration. The Postgres schema is created
/// if missing.
pub async fn build_services(config: &StoreConfig) -> Result<AppServices, StoreError> {
    match config {
        StoreConfig::InMemory => Ok(AppServices::in_memory()),
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresCatalogStore::connect(database_url, *max_connections).await?;
            store.migrate().await?;
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use libris_catalog::{Author, AuthorFields, Resource};
    use libris_infra::{CatalogStore, Repository};

    use super::AppServices;

    // Same shape as the generic handlers: a borrow of request-scoped services.
    async fn count<R>(services: Arc<AppServices>) -> usize
    where
        R: Resource,
        dyn CatalogStore: Repository<R>,
    {
        Repository::<R>::find_all(services.store()).await.unwrap().len()
    }

    #[tokio::test]
    async fn generic_repository_calls_borrow_shared_services() {
        let services = Arc::new(AppServices::in_memory());
        Repository::<Author>::insert(services.store(), AuthorFields { name: "Orwell".into() })
            .await
            .unwrap();
        assert_eq!(count::<Author>(services.clone()).await, 1);
    }
}
