use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::MEMORY_URL;
use crate::document::Document;
use crate::models::{Kind, Record};
use crate::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryDriver;
pub use postgres::PgDriver;

/// Minimal interface a document database has to offer.
///
/// Drivers return raw records carrying the identifier under
/// [`INTERNAL_ID`](crate::document::INTERNAL_ID).
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    fn name(&self) -> &str;

    async fn insert(&self, kind: Kind, doc: Document) -> anyhow::Result<Uuid>;

    /// Records of `kind` matching every pair in `filter`, in insertion order.
    async fn find(
        &self,
        kind: Kind,
        filter: &Document,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>>;

    /// Merges `set` into the record with the given id. Returns whether a
    /// record was touched.
    async fn update_one(&self, kind: Kind, id: Uuid, set: Document) -> anyhow::Result<bool>;

    async fn collection_names(&self) -> anyhow::Result<Vec<String>>;
}

/// Handle to the document store shared by every request.
///
/// A store without a driver is one whose connection was never established;
/// every operation on it fails with `StoreUnavailable`.
#[derive(Clone)]
pub struct Store {
    driver: Option<Arc<dyn DocumentDriver>>,
}

impl Store {
    pub fn new<D: DocumentDriver + 'static>(driver: D) -> Self {
        Self {
            driver: Some(Arc::new(driver)),
        }
    }

    pub fn unavailable() -> Self {
        Self { driver: None }
    }

    pub fn memory() -> Self {
        Self::new(MemoryDriver::default())
    }

    /// Connects to whatever `database_url` points at. Connection failures
    /// are logged and leave the store unavailable.
    pub async fn connect(database_url: Option<&str>) -> Self {
        match database_url {
            None => {
                log::warn!("DATABASE_URL is not set, store is unavailable");
                Self::unavailable()
            }
            Some(MEMORY_URL) => {
                log::info!("Using in-memory document store");
                Self::memory()
            }
            Some(url) => match PgDriver::connect(url).await {
                Ok(driver) => {
                    log::info!("Connected to database `{}`", driver.name());
                    Self::new(driver)
                }
                Err(err) => {
                    log::error!("Could not connect to database: {:#}", err);
                    Self::unavailable()
                }
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.driver.as_deref().map(|driver| driver.name())
    }

    fn driver(&self) -> Result<&dyn DocumentDriver, Error> {
        self.driver.as_deref().ok_or_else(Error::store_unavailable)
    }

    pub async fn create_document<T: Serialize>(
        &self,
        kind: Kind,
        record: &T,
    ) -> Result<String, Error> {
        let driver = self.driver()?;
        let value =
            serde_json::to_value(record).map_err(|err| Error::persistence(err.to_string()))?;
        let doc = match value {
            Value::Object(doc) => doc,
            other => {
                return Err(Error::persistence(format!(
                    "record is not a document: {}",
                    other
                )))
            }
        };
        let id = driver
            .insert(kind, doc)
            .await
            .map_err(|err| Error::persistence(err.to_string()))?;
        log::debug!("created {} {}", kind.collection(), id);
        Ok(id.to_string())
    }

    pub async fn get_documents(
        &self,
        kind: Kind,
        filter: &Document,
    ) -> Result<Vec<Document>, Error> {
        self.driver()?
            .find(kind, filter, None)
            .await
            .map_err(|err| Error::persistence(err.to_string()))
    }

    pub async fn find_one(
        &self,
        kind: Kind,
        filter: &Document,
    ) -> Result<Option<Document>, Error> {
        let mut docs = self
            .driver()?
            .find(kind, filter, Some(1))
            .await
            .map_err(|err| Error::persistence(err.to_string()))?;
        Ok(docs.pop())
    }

    pub async fn update_one(&self, kind: Kind, id: Uuid, set: Document) -> Result<bool, Error> {
        self.driver()?
            .update_one(kind, id, set)
            .await
            .map_err(|err| Error::persistence(err.to_string()))
    }

    pub async fn collection_names(&self) -> Result<Vec<String>, Error> {
        self.driver()?
            .collection_names()
            .await
            .map_err(|err| Error::persistence(err.to_string()))
    }

    pub async fn create<R: Record>(&self, record: &R) -> Result<String, Error> {
        self.create_document(R::KIND, record).await
    }

    pub async fn list<R: Record>(&self, filter: &Document) -> Result<Vec<Document>, Error> {
        self.get_documents(R::KIND, filter).await
    }
}
