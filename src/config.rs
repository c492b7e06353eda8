use crate::error::DriveError;
use clap::Parser;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Parser)]
pub struct StartArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config_path: String,

    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    #[arg(short, long, default_value = "3030")]
    pub port: u16,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name reported by the front end
    pub title: Option<String>,

    /// Directory uploaded blobs are written to
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Largest upload request accepted, in bytes
    #[serde(default = "default_upload_limit")]
    pub upload_limit: usize,

    pub auth: AuthConfig,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DriveError> {
        let config = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub cookie_domain: String,

    #[serde(default = "default_session_hours")]
    pub session_hours: i64,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    #[serde(alias = "password_hash")]
    pub pw_hash: String,
}

fn default_storage_dir() -> String {
    "blobs".to_string()
}

fn default_upload_limit() -> usize {
    256 * 1024 * 1024
}

fn default_session_hours() -> i64 {
    1
}
