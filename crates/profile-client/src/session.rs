//! Persisted login session.
//!
//! Holds the current JWT (nullable) and mirrors it to a JSON file so the
//! login survives restarts. Expiry is checked on read, never refreshed in
//! the background; an expired token just means "log in again".

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::jwt;
use crate::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    token: Option<String>,
}

/// Token store backed by a JSON file under the app data directory.
pub struct TokenStore {
    path: PathBuf,
    token: Option<String>,
}

impl TokenStore {
    /// Load the store from `path`. A missing or unreadable file starts a
    /// logged-out session.
    pub fn load(path: PathBuf) -> Self {
        let token = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<StoredSession>(&raw).ok())
            .and_then(|s| s.token);

        if token.is_some() {
            tracing::debug!(path = %path.display(), "loaded stored session");
        }
        Self { path, token }
    }

    /// The current token, if any. Presence does not imply validity.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token is present and not expired.
    pub fn is_logged_in(&self) -> bool {
        self.token
            .as_deref()
            .is_some_and(|t| !jwt::is_expired(t, jwt::DEFAULT_LEEWAY_SECS))
    }

    /// Store a fresh token and persist it.
    pub fn save_token(&mut self, token: &str) -> Result<()> {
        self.token = Some(token.to_string());
        self.persist()
    }

    /// Drop the stored token (logout or 401 from the backend).
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredSession {
            token: self.token.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}
