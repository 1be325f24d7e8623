//! Infrastructure layer: persistence adapters and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use store::{
    AuthorBooks, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, Repository, StoreError,
    StoreResult,
};
