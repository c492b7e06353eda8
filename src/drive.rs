use crate::{
    backend::{Backend, Principal},
    error::DriveError,
    item::{Item, ItemKind, NewItem, View},
    storage::blob_path,
};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub mod snapshot;
pub mod upload;

pub use snapshot::{CreateDialog, MutationStatus, SessionGate, Snapshot};
pub use upload::{DownloadedFile, UploadFile, UploadOutcome};

/// Item actions offered in the row menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAction {
    Rename,
    Move,
    Delete,
}

/// Items of the active view as last fetched, plus optimistic appends.
#[derive(Debug, Default)]
struct ItemStore {
    items: Vec<Item>,
    error: Option<String>,
    loading: bool,

    /// Ticket of the most recently issued fetch. Only that fetch may replace `items`.
    issued: u64,
}

impl ItemStore {
    fn begin_fetch(&mut self) -> u64 {
        self.issued += 1;
        self.loading = true;
        self.issued
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.issued == ticket
    }

    fn replace(&mut self, items: Vec<Item>) {
        self.items = items;
        self.error = None;
        self.loading = false;
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.loading = false;
    }

    fn append(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Drop everything held and invalidate every fetch still in flight.
    fn clear(&mut self) {
        self.issued += 1;
        self.items.clear();
        self.error = None;
        self.loading = false;
    }
}

#[derive(Debug, Default)]
struct DriveState {
    session: SessionGate,
    view: View,
    query: String,
    store: ItemStore,
    dragging: bool,
    dialog: CreateDialog,
    status: MutationStatus,

    /// Bumped whenever session state is discarded. Mutations started under an older
    /// epoch must not write back.
    epoch: u64,
}

impl DriveState {
    fn discard_session(&mut self) {
        self.epoch += 1;
        self.session = SessionGate::Anonymous;
        self.view = View::default();
        self.query.clear();
        self.store.clear();
        self.dragging = false;
        self.dialog = CreateDialog::default();
        self.status = MutationStatus::Idle;
    }

    fn principal(&self) -> Result<&Principal, DriveError> {
        self.session.principal().ok_or(DriveError::Unauthenticated)
    }
}

/// Drive view controller for a single session.
///
/// State is only locked for short synchronous sections, never across a call to the backend.
/// Overlapping fetches are therefore possible and resolved by their tickets.
#[derive(Debug)]
pub struct DriveController {
    backend: Backend,
    state: Mutex<DriveState>,
}

impl DriveController {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: Mutex::new(DriveState::default()),
        }
    }

    /// Resolve the session and load the default view when someone is signed in.
    ///
    /// Whatever the previous session held is discarded first. An identity failure leaves the
    /// gate `Anonymous` and is returned.
    pub async fn mount(&self) -> Result<SessionGate, DriveError> {
        {
            let mut state = self.state.lock().await;
            state.discard_session();
            state.session = SessionGate::Resolving;
        }

        let session = match self.backend.identity.current_principal().await {
            Ok(Some(principal)) => SessionGate::Authenticated(principal),
            Ok(None) => SessionGate::Anonymous,
            Err(e) => {
                error!("Unable to resolve session: {e}");
                self.state.lock().await.session = SessionGate::Anonymous;
                return Err(DriveError::SessionUnresolved(e));
            }
        };

        self.state.lock().await.session = session.clone();

        match session.principal() {
            Some(principal) => {
                info!("Session resolved for {}", principal.id);
                if let Err(e) = self.refresh().await {
                    warn!("Initial fetch failed: {e}");
                }
            }
            None => debug!("No principal for session"),
        }

        Ok(session)
    }

    /// Discard all session scoped state.
    pub async fn unmount(&self) {
        self.state.lock().await.discard_session();
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            session: state.session.clone(),
            view: state.view,
            query: state.query.clone(),
            items: state.store.items.clone(),
            error: state.store.error.clone(),
            loading: state.store.loading,
            dragging: state.dragging,
            dialog: state.dialog.clone(),
            status: state.status.clone(),
        }
    }

    pub async fn principal(&self) -> Option<Principal> {
        self.state.lock().await.session.principal().cloned()
    }

    /// Switch the active view and load its items.
    pub async fn select_view(&self, view: View) -> Result<(), DriveError> {
        self.state.lock().await.view = view;
        self.refresh().await
    }

    pub async fn set_query(&self, query: impl Into<String>) {
        self.state.lock().await.query = query.into();
    }

    /// Replace the held items with the backing service's items for the active view.
    ///
    /// A response arriving after a newer fetch was issued is discarded.
    pub async fn refresh(&self) -> Result<(), DriveError> {
        let (ticket, owner_id, view) = {
            let mut state = self.state.lock().await;
            let owner_id = state.principal()?.id.clone();
            let ticket = state.store.begin_fetch();
            (ticket, owner_id, state.view)
        };

        debug!("Fetch {ticket}: {view}");

        let result = self.backend.rows.query(&owner_id, view).await;

        let mut state = self.state.lock().await;

        if !state.store.is_current(ticket) {
            debug!("Fetch {ticket}: superseded, discarding");
            return Ok(());
        }

        match result {
            Ok(items) => {
                debug!("Fetch {ticket}: {} item(s)", items.len());
                state.store.replace(items);
                Ok(())
            }
            Err(e) => {
                let e = DriveError::FetchFailed(e);
                error!("Fetch {ticket}: {e}");
                state.store.fail(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn open_create_dialog(&self) {
        self.state.lock().await.dialog.open = true;
    }

    pub async fn close_create_dialog(&self) {
        self.state.lock().await.dialog.open = false;
    }

    pub async fn set_new_item_name(&self, name: impl Into<String>) {
        self.state.lock().await.dialog.name = name.into();
    }

    pub async fn set_new_item_kind(&self, kind: ItemKind) {
        self.state.lock().await.dialog.kind = kind;
    }

    /// Fill in the dialog and submit it.
    pub async fn submit_new_item(
        &self,
        name: impl Into<String>,
        kind: ItemKind,
    ) -> Result<Item, DriveError> {
        {
            let mut state = self.state.lock().await;
            state.dialog.open = true;
            state.dialog.name = name.into();
            state.dialog.kind = kind;
        }
        self.create_item().await
    }

    /// Create an item from the dialog contents in the active view.
    pub async fn create_item(&self) -> Result<Item, DriveError> {
        let (epoch, new_item) = {
            let mut state = self.state.lock().await;
            let owner_id = state.principal()?.id.clone();

            if state.dialog.name.trim().is_empty() {
                state.status = MutationStatus::Failed(DriveError::InvalidName.to_string());
                return Err(DriveError::InvalidName);
            }

            state.status = MutationStatus::Submitting;

            let new_item = NewItem {
                name: state.dialog.name.clone(),
                kind: state.dialog.kind,
                last_modified: Utc::now(),
                view: state.view,
                file_path: None,
                owner_id,
            };

            (state.epoch, new_item)
        };

        let result = self.backend.rows.insert(new_item).await;

        let mut state = self.state.lock().await;

        if state.epoch != epoch {
            debug!("Session ended while creating an item, not applying result");
            return result.map_err(DriveError::CreateFailed);
        }

        match result {
            Ok(item) => {
                info!("Created {} {}", item.kind.as_str(), item.name);
                if item.view == state.view {
                    state.store.append(item.clone());
                }
                state.dialog.open = false;
                state.dialog.name.clear();
                state.status = MutationStatus::Succeeded;
                Ok(item)
            }
            Err(e) => {
                let e = DriveError::CreateFailed(e);
                error!("{e}");
                state.status = MutationStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Upload files one after another into the active view.
    ///
    /// A failing file does not stop the batch, every file gets an outcome in submission order.
    /// If the session is discarded mid batch the remaining files are not uploaded.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<UploadOutcome>, DriveError> {
        let (epoch, owner_id, view) = {
            let mut state = self.state.lock().await;
            let owner_id = state.principal()?.id.clone();
            if files.is_empty() {
                debug!("Empty upload batch");
                return Ok(vec![]);
            }
            state.status = MutationStatus::Submitting;
            (state.epoch, owner_id, state.view)
        };

        let total = files.len();
        let mut outcomes = Vec::with_capacity(total);

        for UploadFile { name, bytes } in files {
            if self.state.lock().await.epoch != epoch {
                outcomes.push(UploadOutcome::Failed {
                    name,
                    cause: DriveError::Unauthenticated.to_string(),
                });
                continue;
            }

            match self.upload_one(&owner_id, view, &name, bytes).await {
                Ok(item) => {
                    let mut state = self.state.lock().await;
                    if state.epoch == epoch && item.view == state.view {
                        state.store.append(item.clone());
                    }
                    outcomes.push(UploadOutcome::Uploaded { item });
                }
                Err(e) => {
                    warn!("{e}");
                    outcomes.push(UploadOutcome::Failed {
                        name,
                        cause: e.to_string(),
                    });
                }
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_uploaded()).count();

        info!("Uploaded {} of {total} file(s)", total - failed);

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            state.status = if failed == 0 {
                MutationStatus::Succeeded
            } else {
                MutationStatus::Failed(format!("{failed} of {total} upload(s) failed"))
            };
        }

        Ok(outcomes)
    }

    async fn upload_one(
        &self,
        owner_id: &str,
        view: View,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<Item, DriveError> {
        let failed = |source| DriveError::UploadFailed {
            name: name.to_string(),
            source,
        };

        let path = blob_path(owner_id, view, name).map_err(failed)?;

        let stored_path = self
            .backend
            .blobs
            .upload(&path, bytes)
            .await
            .map_err(failed)?;

        let new_item = NewItem {
            name: name.to_string(),
            kind: ItemKind::File,
            last_modified: Utc::now(),
            view,
            file_path: Some(stored_path),
            owner_id: owner_id.to_string(),
        };

        self.backend.rows.insert(new_item).await.map_err(|e| {
            error!("Blob stored at {path} but its record could not be created");
            failed(e)
        })
    }

    /// Retrieve the blob of an uploaded file.
    ///
    /// Returns `None` without contacting the blob store for folders and files without a blob.
    pub async fn download(&self, item: &Item) -> Result<Option<DownloadedFile>, DriveError> {
        let principal = self.principal().await.ok_or(DriveError::Unauthenticated)?;

        if item.owner_id != principal.id {
            return Err(DriveError::NotFound(item.id.to_string()));
        }

        let Some(path) = item.file_path.as_deref().filter(|_| item.is_downloadable()) else {
            debug!("Nothing to download for {}", item.name);
            return Ok(None);
        };

        match self.backend.blobs.download(path).await {
            Ok(bytes) => Ok(Some(DownloadedFile {
                name: item.name.clone(),
                bytes,
            })),
            Err(e) => {
                let e = DriveError::DownloadFailed(e);
                error!("{}: {e}", item.name);
                Err(e)
            }
        }
    }

    /// Download an item currently held for the active view.
    pub async fn download_by_id(
        &self,
        id: uuid::Uuid,
    ) -> Result<Option<DownloadedFile>, DriveError> {
        let item = {
            let state = self.state.lock().await;
            state.principal()?;
            state.store.items.iter().find(|item| item.id == id).cloned()
        };

        let Some(item) = item else {
            return Err(DriveError::NotFound(id.to_string()));
        };

        self.download(&item).await
    }

    /// Row menu entries are offered but have no effect yet.
    pub async fn apply_menu_action(
        &self,
        id: uuid::Uuid,
        action: MenuAction,
    ) -> Result<(), DriveError> {
        self.state.lock().await.principal()?;
        debug!("{action:?} requested for {id}, not supported");
        Ok(())
    }

    pub async fn drag_enter(&self) {
        self.state.lock().await.dragging = true;
    }

    pub async fn drag_leave(&self) {
        self.state.lock().await.dragging = false;
    }

    /// Files dropped onto the drive surface are uploaded into the active view.
    pub async fn drop_files(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<Vec<UploadOutcome>, DriveError> {
        self.drag_leave().await;
        self.upload(files).await
    }
}
