use super::session_id;
use crate::{
    auth::AuthError,
    backend::Principal,
    drive::{
        CreateDialog, DownloadedFile, MenuAction, MutationStatus, Snapshot, UploadFile,
        UploadOutcome,
    },
    error::DriveError,
    item::{Item, ItemKind, View},
    state::AppState,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub(super) struct SessionId(uuid::Uuid);

/// Everything the drive page renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DrivePage {
    title: Option<String>,
    heading: &'static str,
    user: Option<Principal>,
    view: View,
    query: String,
    items: Vec<Item>,
    error: Option<String>,
    loading: bool,
    dragging: bool,
    dialog: CreateDialog,
    status: MutationStatus,
}

impl DrivePage {
    pub fn new(title: Option<String>, snapshot: Snapshot) -> Self {
        let items = snapshot.visible_items().into_iter().cloned().collect();
        let Snapshot {
            session,
            view,
            query,
            error,
            loading,
            dragging,
            dialog,
            status,
            ..
        } = snapshot;

        Self {
            title,
            heading: view.title(),
            user: session.principal().cloned(),
            view,
            query,
            items,
            error,
            loading,
            dragging,
            dialog,
            status,
        }
    }
}

pub(super) fn drive_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(page))
        .route("/view", put(select_view))
        .route("/query", put(set_query))
        .route("/drag", put(set_dragging))
        .route("/items", post(create_item))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(state.upload_limit)),
        )
        .route("/items/:id/download", get(download))
        .route("/items/:id/action", post(menu_action))
        .layer(middleware::from_fn_with_state(state.clone(), session_check))
        .with_state(state);

    Router::new().nest("/drive", router)
}

async fn session_check(
    state: State<AppState>,
    cookie: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, DriveError> {
    let Some(session_id) = session_id(cookie) else {
        return Err(AuthError::NoSession.into());
    };

    if state.auth.session_owner(session_id).await?.is_none() {
        state.evict(session_id).await;
        return Err(AuthError::NoSession.into());
    }

    req.extensions_mut().insert(SessionId(session_id));

    Ok(next.run(req).await)
}

async fn render(state: &AppState, session: SessionId) -> Result<Json<DrivePage>, DriveError> {
    let drive = state.controller(session.0).await?;
    Ok(Json(DrivePage::new(state.title.clone(), drive.snapshot().await)))
}

#[debug_handler]
async fn page(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<DrivePage>, DriveError> {
    render(&state, session).await
}

#[derive(Debug, Deserialize)]
struct SelectView {
    view: View,
}

async fn select_view(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(SelectView { view }): Json<SelectView>,
) -> Result<Json<DrivePage>, DriveError> {
    let drive = state.controller(session.0).await?;
    drive.select_view(view).await?;
    render(&state, session).await
}

#[derive(Debug, Deserialize)]
struct SetQuery {
    query: String,
}

async fn set_query(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(SetQuery { query }): Json<SetQuery>,
) -> Result<Json<DrivePage>, DriveError> {
    let drive = state.controller(session.0).await?;
    drive.set_query(query).await;
    render(&state, session).await
}

#[derive(Debug, Deserialize)]
struct SetDragging {
    dragging: bool,
}

async fn set_dragging(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(SetDragging { dragging }): Json<SetDragging>,
) -> Result<StatusCode, DriveError> {
    let drive = state.controller(session.0).await?;
    if dragging {
        drive.drag_enter().await;
    } else {
        drive.drag_leave().await;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CreateItem {
    name: String,
    #[serde(default)]
    kind: ItemKind,
}

async fn create_item(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(CreateItem { name, kind }): Json<CreateItem>,
) -> Result<(StatusCode, Json<Item>), DriveError> {
    let drive = state.controller(session.0).await?;
    let item = drive.submit_new_item(name, kind).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Default, Deserialize)]
struct UploadParams {
    /// Set when the files were dropped onto the page rather than picked.
    #[serde(default)]
    dropped: bool,
}

async fn upload(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(UploadParams { dropped }): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadOutcome>>, DriveError> {
    let drive = state.controller(session.0).await?;

    // Files that could not be read keep their position in the batch
    let mut files = vec![];
    let mut unreadable = vec![];

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if unreadable.is_empty() => return Err(e.into()),
            Err(e) => {
                warn!("Upload request cut short: {e}");
                break;
            }
        };

        let Some(name) = field.file_name().map(ToOwned::to_owned) else {
            debug!("Skipping non file field {:?}", field.name());
            continue;
        };

        match field.bytes().await {
            Ok(bytes) => {
                files.push(UploadFile::new(name, bytes.to_vec()));
                unreadable.push(None);
            }
            Err(e) => {
                warn!("Unable to read {name}: {e}");
                let cause = DriveError::from(e).to_string();
                unreadable.push(Some(UploadOutcome::Failed { name, cause }));
            }
        }
    }

    if files.is_empty() && unreadable.is_empty() {
        return Ok(Json(vec![]));
    }

    let uploaded = if dropped {
        drive.drop_files(files).await?
    } else {
        drive.upload(files).await?
    };

    Ok(Json(merge_outcomes(unreadable, uploaded)))
}

/// Fill the positions of readable files with their upload outcomes, in order.
fn merge_outcomes(
    unreadable: Vec<Option<UploadOutcome>>,
    uploaded: Vec<UploadOutcome>,
) -> Vec<UploadOutcome> {
    let mut uploaded = uploaded.into_iter();
    unreadable
        .into_iter()
        .filter_map(|slot| slot.or_else(|| uploaded.next()))
        .collect()
}

fn content_disposition(name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        name.replace(['"', '\\', '\r', '\n'], "_")
    )
}

fn file_response(file: Option<DownloadedFile>) -> Response {
    let Some(DownloadedFile { name, bytes }) = file else {
        return StatusCode::NO_CONTENT.into_response();
    };

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&name)),
        ],
        bytes,
    )
        .into_response()
}

async fn download(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Response, DriveError> {
    let drive = state.controller(session.0).await?;
    Ok(file_response(drive.download_by_id(id).await?))
}

#[derive(Debug, Deserialize)]
struct ApplyAction {
    action: MenuAction,
}

async fn menu_action(
    state: State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(id): Path<uuid::Uuid>,
    Json(ApplyAction { action }): Json<ApplyAction>,
) -> Result<StatusCode, DriveError> {
    let drive = state.controller(session.0).await?;
    drive.apply_menu_action(id, action).await?;
    Ok(StatusCode::NO_CONTENT)
}
