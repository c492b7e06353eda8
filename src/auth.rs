use self::{db::AuthDatabase, models::Session};
use crate::{
    backend::{BackendError, Identity, Principal},
    config::{AccountConfig, AuthConfig},
    error::DriveError,
};
use argon2::{password_hash::PasswordHashString, PasswordVerifier};
use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub mod db;
pub mod models;

pub const SESSION_COOKIE: &str = "SID";

/// Password hashes of every account allowed to sign in.
#[derive(Debug, Default)]
pub struct Accounts {
    hashes: HashMap<String, PasswordHashString>,
}

impl Accounts {
    pub fn new(accounts: Vec<AccountConfig>) -> Result<Self, AuthError> {
        let mut hashes = HashMap::new();
        for AccountConfig { username, pw_hash } in accounts {
            let hash = PasswordHashString::new(&pw_hash)
                .map_err(|e| AuthError::Configuration(format!("{username}: {e}")))?;
            hashes.insert(username, hash);
        }
        Ok(Self { hashes })
    }

    pub fn verify_password(&self, username: &str, password: &str) -> bool {
        let Some(hash) = self.hashes.get(username) else {
            return false;
        };

        argon2::Argon2::default()
            .verify_password(password.as_bytes(), &hash.password_hash())
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[derive(Debug)]
pub struct Auth {
    cookie_domain: String,
    session_duration: Duration,
    accounts: Accounts,
    db: AuthDatabase,
}

impl Auth {
    pub fn new(
        db: AuthDatabase,
        AuthConfig {
            cookie_domain,
            session_hours,
            accounts,
        }: AuthConfig,
    ) -> Result<Self, AuthError> {
        let accounts = Accounts::new(accounts)?;
        info!("Loaded {} account(s)", accounts.len());

        Ok(Self {
            cookie_domain,
            session_duration: Duration::hours(session_hours),
            accounts,
            db,
        })
    }

    pub fn verify_password(&self, username: &str, password: &str) -> bool {
        self.accounts.verify_password(username, password)
    }

    pub async fn create_session(&self, owner_id: &str) -> Result<Session, DriveError> {
        let id = uuid::Uuid::new_v4();
        let expires = Utc::now() + self.session_duration;
        let session = self.db.insert_session(id, owner_id, expires).await?;
        debug!("Created session for {owner_id}, expires {}", session.expires);
        Ok(session)
    }

    pub async fn end_session(&self, session_id: uuid::Uuid) -> Result<(), DriveError> {
        self.db.delete_session(session_id).await?;
        Ok(())
    }

    /// Owner of the session if it is still valid.
    pub async fn session_owner(
        &self,
        session_id: uuid::Uuid,
    ) -> Result<Option<String>, DriveError> {
        Ok(self.db.session_owner(session_id).await?)
    }

    pub async fn purge_expired(&self) -> Result<(), DriveError> {
        let purged = self.db.purge_expired().await?;
        if purged > 0 {
            info!("Purged {purged} expired session(s)");
        }
        Ok(())
    }

    /// Identity capability resolving the principal of a single session.
    pub fn identity(&self, session_id: uuid::Uuid) -> SessionIdentity {
        SessionIdentity {
            db: self.db.clone(),
            session_id,
        }
    }

    pub fn create_session_cookie(&self, session_id: uuid::Uuid) -> Cookie<'_> {
        let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
        cookie.set_secure(true);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_domain(&self.cookie_domain);
        cookie.set_path("/");
        cookie.set_max_age(cookie::time::Duration::seconds(
            self.session_duration.num_seconds(),
        ));
        cookie
    }

    pub fn removal_cookie(&self) -> Cookie<'_> {
        let mut cookie = self.create_session_cookie(uuid::Uuid::nil());
        cookie.make_removal();
        cookie
    }
}

#[derive(Debug, Clone)]
pub struct SessionIdentity {
    db: AuthDatabase,
    session_id: uuid::Uuid,
}

#[async_trait]
impl Identity for SessionIdentity {
    async fn current_principal(&self) -> Result<Option<Principal>, BackendError> {
        Ok(self
            .db
            .session_owner(self.session_id)
            .await?
            .map(Principal::new))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Session required for requested resource")]
    NoSession,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid account configuration: {0}")]
    Configuration(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::NoSession => (StatusCode::UNAUTHORIZED, "Sign in to continue").into_response(),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Configuration(e) => (StatusCode::INTERNAL_SERVER_ERROR, e).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{password_hash::SaltString, PasswordHasher};

    fn hash(password: &str) -> String {
        let salt = SaltString::from_b64("c29tZXNhbHRzb21lc2FsdA").unwrap();
        argon2::Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn verifies_known_accounts() {
        let accounts = Accounts::new(vec![AccountConfig {
            username: "alice".to_string(),
            pw_hash: hash("hunter2"),
        }])
        .unwrap();

        assert!(accounts.verify_password("alice", "hunter2"));
        assert!(!accounts.verify_password("alice", "hunter3"));
        assert!(!accounts.verify_password("bob", "hunter2"));
    }

    #[test]
    fn rejects_malformed_hash() {
        let result = Accounts::new(vec![AccountConfig {
            username: "alice".to_string(),
            pw_hash: "plaintext".to_string(),
        }]);

        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }
}
