//! Persistence for cars and leads.
//!
//! Both entities sit behind async repository traits so the service layer does
//! not care which backend holds them. [`Storage`] owns one backend instance,
//! chosen by configuration, and exposes it through the two traits plus a
//! lifecycle handle for health checks and shutdown.

pub mod car_repo;
pub mod contact_repo;
pub mod errors;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::constants::API_NAME;
use crate::models::{Car, CarChanges, CarFilter, Contact, ContactChanges, NewCar, NewContact};

pub use errors::{RepositoryError, RepositoryResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Persists a new car with the given image references, assigning its id
    /// and setting `created_at == updated_at`.
    async fn create(&self, car: NewCar, image_urls: Vec<String>) -> RepositoryResult<Car>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Car>>;

    /// Merges `changes` over the stored car, appends `new_image_urls` to its
    /// image list and refreshes `updated_at`. `None` when the id is unknown.
    async fn update(
        &self,
        id: i64,
        changes: CarChanges,
        new_image_urls: Vec<String>,
    ) -> RepositoryResult<Option<Car>>;

    /// Returns whether a car was removed. Leads pointing at it are detached.
    async fn delete(&self, id: i64) -> RepositoryResult<bool>;

    /// Cars matching `filter`, newest first.
    async fn list(&self, filter: &CarFilter) -> RepositoryResult<Vec<Car>>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Fails with [`RepositoryError::MissingCarReference`] when `car_id` does
    /// not resolve.
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact>;

    /// All leads, newest first.
    async fn list(&self) -> RepositoryResult<Vec<Contact>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Contact>>;

    async fn update(&self, id: i64, changes: ContactChanges) -> RepositoryResult<Option<Contact>>;

    async fn delete(&self, id: i64) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait StorageLifecycle: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Cheap round trip used by the health probe.
    async fn ping(&self) -> RepositoryResult<()>;

    async fn close(&self);
}

/// Handle to the configured backend. Cloning shares the same backend.
#[derive(Clone)]
pub struct Storage {
    pub cars: Arc<dyn CarRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    lifecycle: Arc<dyn StorageLifecycle>,
}

impl Storage {
    /// Opens the backend selected by `config`, running migrations for
    /// Postgres.
    pub async fn open(config: &Config) -> RepositoryResult<Self> {
        match config.storage_backend {
            StorageBackend::Postgres => {
                let store =
                    PgStore::connect(&config.database_url, config.database_max_connections).await?;
                store.migrate().await?;
                tracing::info!("{} Connected to Postgres storage", API_NAME);
                Ok(Self::from_backend(Arc::new(store)))
            }
            StorageBackend::Memory => {
                tracing::warn!("{} Using in-memory storage; data is lost on restart", API_NAME);
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CarRepository + ContactRepository + StorageLifecycle + 'static,
    {
        Storage {
            cars: backend.clone(),
            contacts: backend.clone(),
            lifecycle: backend,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.lifecycle.backend_name()
    }

    pub async fn ping(&self) -> RepositoryResult<()> {
        self.lifecycle.ping().await
    }

    pub async fn close(&self) {
        self.lifecycle.close().await;
        tracing::info!("{} Storage closed", API_NAME);
    }
}
