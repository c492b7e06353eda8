use crate::{auth::AuthError, backend::BackendError};
use axum::{extract::multipart::MultipartError, http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Sign in to continue")]
    Unauthenticated,

    #[error("Could not resolve session: {0}")]
    SessionUnresolved(#[source] BackendError),

    #[error("Could not load items: {0}")]
    FetchFailed(#[source] BackendError),

    #[error("Could not create item: {0}")]
    CreateFailed(#[source] BackendError),

    #[error("Could not upload {name}: {source}")]
    UploadFailed { name: String, source: BackendError },

    #[error("Could not download file: {0}")]
    DownloadFailed(#[source] BackendError),

    #[error("Item name must not be empty")]
    InvalidName,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Multipart(#[from] MultipartError),
}

impl DriveError {
    fn status(&self) -> StatusCode {
        match self {
            DriveError::Unauthenticated | DriveError::Auth(_) => StatusCode::UNAUTHORIZED,
            DriveError::SessionUnresolved(e)
            | DriveError::FetchFailed(e)
            | DriveError::CreateFailed(e)
            | DriveError::DownloadFailed(e)
            | DriveError::UploadFailed { source: e, .. }
            | DriveError::Backend(e) => match e {
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                BackendError::Database(_)
                | BackendError::Io(_)
                | BackendError::InvalidRecord(_) => StatusCode::BAD_GATEWAY,
            },
            DriveError::InvalidName | DriveError::Multipart(_) => StatusCode::BAD_REQUEST,
            DriveError::NotFound(_) => StatusCode::NOT_FOUND,
            DriveError::IO(_) | DriveError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DriveError {
    fn into_response(self) -> axum::response::Response {
        match self {
            DriveError::Auth(e) => e.into_response(),
            e => (e.status(), e.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_conflict_maps_to_409() {
        let e = DriveError::UploadFailed {
            name: "a.txt".to_string(),
            source: BackendError::Conflict("alice/myDrive/a.txt".to_string()),
        };
        assert_eq!(StatusCode::CONFLICT, e.into_response().status());
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        let response = DriveError::from(AuthError::NoSession).into_response();
        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        assert_eq!(
            StatusCode::UNAUTHORIZED,
            DriveError::Unauthenticated.into_response().status()
        );
    }

    #[test]
    fn fetch_failure_is_bad_gateway() {
        let e = DriveError::FetchFailed(BackendError::InvalidRecord("kind".to_string()));
        assert_eq!(StatusCode::BAD_GATEWAY, e.into_response().status());
    }
}
