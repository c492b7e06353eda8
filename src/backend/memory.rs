use super::{BackendError, BlobStore, Identity, Principal, RowStore};
use crate::item::{Item, NewItem, View};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::Notify;

/// Identity resolving to a fixed principal, which tests can change or hold back.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    principal: Mutex<Option<Principal>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fail: bool,
}

impl StaticIdentity {
    pub fn signed_in(id: &str) -> Self {
        Self {
            principal: Mutex::new(Some(Principal::new(id))),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sign_out(&self) {
        self.principal.lock().unwrap().take();
    }

    /// The next lookup blocks until the returned handle is notified.
    pub fn pause(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gate.lock().unwrap().replace(gate.clone());
        gate
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    async fn current_principal(&self) -> Result<Option<Principal>, BackendError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail {
            return Err(BackendError::NotFound("identity provider".to_string()));
        }
        Ok(self.principal.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRowStore {
    items: Mutex<Vec<Item>>,
    gates: Mutex<HashMap<View, Arc<Notify>>>,
    insert_gate: Mutex<Option<Arc<Notify>>>,
    pub fail_query: AtomicBool,
    pub fail_insert: AtomicBool,
    pub queries: AtomicUsize,
}

impl MemoryRowStore {
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }

    /// The next query for `view` blocks until the returned handle is notified.
    pub fn pause(&self, view: View) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(view, gate.clone());
        gate
    }

    /// The next insert blocks until the returned handle is notified.
    pub fn pause_insert(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.insert_gate.lock().unwrap().replace(gate.clone());
        gate
    }

    pub fn stored(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn query(&self, owner_id: &str, view: View) -> Result<Vec<Item>, BackendError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().remove(&view);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_query.load(Ordering::SeqCst) {
            return Err(BackendError::NotFound("items".to_string()));
        }

        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.owner_id == owner_id && item.view == view)
            .cloned()
            .collect())
    }

    async fn insert(&self, item: NewItem) -> Result<Item, BackendError> {
        let gate = self.insert_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(BackendError::Conflict(item.name));
        }

        let item = item.with_id(uuid::Uuid::new_v4());
        self.items.lock().unwrap().push(item.clone());
        Ok(item)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    pub downloads: AtomicUsize,
}

impl MemoryBlobStore {
    /// Uploads whose path ends with `file_name` fail.
    pub fn fail_on(&self, file_name: &str) {
        self.failing.lock().unwrap().insert(file_name.to_string());
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn paths(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|name| path.ends_with(name.as_str()));

        if fails {
            return Err(BackendError::Io(std::io::Error::other("storage write failed")));
        }

        self.blobs.lock().unwrap().insert(path.to_string(), bytes);
        Ok(path.to_string())
    }

    async fn download(&self, stored_path: &str) -> Result<Vec<u8>, BackendError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .get(stored_path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(stored_path.to_string()))
    }
}
