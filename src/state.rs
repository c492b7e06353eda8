use crate::{
    auth::{Auth, AuthError},
    backend::{Backend, BlobStore, RowStore},
    drive::DriveController,
    error::DriveError,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info};

type Controllers = HashMap<uuid::Uuid, Arc<DriveController>>;

/// Shared server state. Holds one drive controller per signed in session.
#[derive(Debug, Clone)]
pub struct AppState {
    pub title: Option<String>,
    pub auth: Arc<Auth>,
    pub upload_limit: usize,
    rows: Arc<dyn RowStore>,
    blobs: Arc<dyn BlobStore>,
    sessions: Arc<RwLock<Controllers>>,
}

impl AppState {
    pub fn new(
        title: Option<String>,
        auth: Auth,
        rows: Arc<dyn RowStore>,
        blobs: Arc<dyn BlobStore>,
        upload_limit: usize,
    ) -> Self {
        Self {
            title,
            auth: Arc::new(auth),
            upload_limit,
            rows,
            blobs,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The controller of `session_id`, mounting a new one if the session has none yet.
    pub async fn controller(
        &self,
        session_id: uuid::Uuid,
    ) -> Result<Arc<DriveController>, DriveError> {
        if let Some(controller) = self.sessions.read().await.get(&session_id) {
            return Ok(controller.clone());
        }

        let backend = Backend::new(
            Arc::new(self.auth.identity(session_id)),
            self.rows.clone(),
            self.blobs.clone(),
        );

        let controller = Arc::new(DriveController::new(backend));

        if controller.mount().await?.principal().is_none() {
            return Err(AuthError::NoSession.into());
        }

        debug!("Mounted drive for session {session_id}");

        Ok(self
            .sessions
            .write()
            .await
            .entry(session_id)
            .or_insert(controller)
            .clone())
    }

    /// Discard the controller of a session that ended or expired.
    pub async fn evict(&self, session_id: uuid::Uuid) {
        let controller = self.sessions.write().await.remove(&session_id);
        if let Some(controller) = controller {
            controller.unmount().await;
            debug!("Evicted drive for session {session_id}");
        }
    }

    pub async fn end_session(&self, session_id: uuid::Uuid) -> Result<(), DriveError> {
        self.evict(session_id).await;
        self.auth.end_session(session_id).await
    }

    /// Remove expired sessions and every controller belonging to one.
    pub async fn purge_expired(&self) -> Result<(), DriveError> {
        self.auth.purge_expired().await?;

        let ids = self
            .sessions
            .read()
            .await
            .keys()
            .copied()
            .collect::<Vec<_>>();

        let mut evicted = 0;
        for id in ids {
            if self.auth.session_owner(id).await?.is_none() {
                self.evict(id).await;
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!("Evicted {evicted} expired drive session(s)");
        }

        Ok(())
    }
}
