use crate::{
    auth::{AuthError, SESSION_COOKIE},
    error::DriveError,
    state::AppState,
};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use self::drive::{drive_router, DrivePage};

mod drive;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    public_router(state.clone())
        .merge(drive_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn public_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Session id carried by the `SID` cookie, if any.
pub(crate) fn session_id(cookie: Option<TypedHeader<Cookie>>) -> Option<uuid::Uuid> {
    let cookie = cookie?;
    uuid::Uuid::parse_str(cookie.get(SESSION_COOKIE)?).ok()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    state: State<AppState>,
    Json(LoginRequest { username, password }): Json<LoginRequest>,
) -> Result<Response, DriveError> {
    if !state.auth.verify_password(&username, &password) {
        warn!("Failed sign in attempt for {username}");
        return Err(AuthError::InvalidCredentials.into());
    }

    let session = state.auth.create_session(&username).await?;
    let drive = state.controller(session.id).await?;
    let cookie = state.auth.create_session_cookie(session.id);

    info!("{username} signed in");

    let page = DrivePage::new(state.title.clone(), drive.snapshot().await);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(page),
    )
        .into_response())
}

async fn logout(
    state: State<AppState>,
    cookie: Option<TypedHeader<Cookie>>,
) -> Result<Response, DriveError> {
    if let Some(session_id) = session_id(cookie) {
        state.end_session(session_id).await?;
    }

    let cookie = state.auth.removal_cookie();

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{db::AuthDatabase, Auth},
        backend::memory::{MemoryBlobStore, MemoryRowStore},
        config::AuthConfig,
    };
    use axum::{body::Body, http::Request};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    // None of the requests below get far enough to touch the database
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://drive@localhost/drive")
            .unwrap();

        let auth = Auth::new(
            AuthDatabase::new(pool),
            AuthConfig {
                cookie_domain: "localhost".to_string(),
                session_hours: 1,
                accounts: vec![],
            },
        )
        .unwrap();

        router(AppState::new(
            None,
            auth,
            Arc::new(MemoryRowStore::default()),
            Arc::new(MemoryBlobStore::default()),
            1024,
        ))
    }

    #[tokio::test]
    async fn drive_requires_session_cookie() {
        let response = app()
            .oneshot(Request::get("/drive").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
    }

    #[tokio::test]
    async fn malformed_session_cookie_is_rejected() {
        let request = Request::get("/drive/items/00000000-0000-0000-0000-000000000000/download")
            .header(header::COOKIE, "SID=not-a-session")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
    }

    #[tokio::test]
    async fn unknown_account_cannot_sign_in() {
        let request = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"mallory","password":"guess"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
    }

    #[tokio::test]
    async fn logout_without_session_clears_cookie() {
        let response = app()
            .oneshot(Request::post("/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(StatusCode::NO_CONTENT, response.status());
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("SID="));
        assert!(cookie.contains("Max-Age=0"));
    }
}
