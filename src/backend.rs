use crate::item::{Item, NewItem, View};
use async_trait::async_trait;
use serde::Serialize;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

#[cfg(test)]
pub mod memory;

/// The authenticated user a session resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[async_trait]
pub trait Identity: Debug + Send + Sync {
    async fn current_principal(&self) -> Result<Option<Principal>, BackendError>;
}

#[async_trait]
pub trait RowStore: Debug + Send + Sync {
    /// All items of `owner_id` placed in `view`.
    async fn query(&self, owner_id: &str, view: View) -> Result<Vec<Item>, BackendError>;

    /// Persist a new item. The returned item carries the id assigned by the store.
    async fn insert(&self, item: NewItem) -> Result<Item, BackendError>;
}

#[async_trait]
pub trait BlobStore: Debug + Send + Sync {
    /// Store `bytes` under `path` and return the path the blob can be retrieved with.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BackendError>;

    async fn download(&self, stored_path: &str) -> Result<Vec<u8>, BackendError>;
}

/// The set of capability objects a controller is constructed with.
#[derive(Debug, Clone)]
pub struct Backend {
    pub identity: Arc<dyn Identity>,
    pub rows: Arc<dyn RowStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backend {
    pub fn new(
        identity: Arc<dyn Identity>,
        rows: Arc<dyn RowStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            rows,
            blobs,
        }
    }
}
