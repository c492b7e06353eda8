use crate::{
    backend::{BackendError, BlobStore},
    item::View,
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

/// Storage key for an uploaded file, `{owner}/{view}/{file_name}`.
///
/// Only the last component of `file_name` is kept so a client supplied name
/// can never place a blob outside of its owner's directory.
pub fn blob_path(owner_id: &str, view: View, file_name: &str) -> Result<String, BackendError> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(BackendError::InvalidPath(format!(
            "{file_name:?}: not a valid file name"
        )));
    }

    if owner_id.is_empty() || owner_id.contains(['/', '\\']) || owner_id.starts_with('.') {
        return Err(BackendError::InvalidPath(format!(
            "{owner_id:?}: not a valid owner"
        )));
    }

    Ok(format!("{owner_id}/{view}/{name}"))
}

/// Blob store keeping every upload as a plain file below `root`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("Storing blobs in {}", root.display());
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(path);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if path.is_empty() || escapes {
            return Err(BackendError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackendError::Conflict(path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&bytes).await?;
        file.flush().await?;

        debug!("Stored {} bytes at {path}", bytes.len());

        Ok(path.to_string())
    }

    async fn download(&self, stored_path: &str) -> Result<Vec<u8>, BackendError> {
        let full_path = self.resolve(stored_path)?;

        match fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::NotFound(stored_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
