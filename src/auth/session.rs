use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::constants::{SESSION_COOKIE, SESSION_MAX_AGE_SECS};
use crate::db::Store;
use crate::{keys, Uid};

/// Generate a cryptographically secure random session token.
pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// `Set-Cookie` value that (re)issues a session cookie scoped to `path`.
pub fn session_cookie(token: &str, path: &str, secure: bool) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly{secure}; SameSite=Lax; Path={path}; Max-Age={SESSION_MAX_AGE_SECS}"
    )
}

/// Per-session state carried between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Logged-in user, `0` for guests.
    #[serde(default)]
    pub uid: Uid,
    /// Last time (epoch ms) this session was counted as viewing each profile.
    #[serde(default)]
    pub uids_viewed: HashMap<Uid, i64>,
    /// Set when the user's email changed; shown once on their next profile view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_changed: Option<String>,
}

/// Session records kept in the store under `session:<token>`.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn Store>,
}

impl Sessions {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Load a session. `None` when no session was ever issued for `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the record is corrupt.
    pub async fn load(&self, token: &str) -> Result<Option<SessionData>> {
        self.store
            .get_object_field(&keys::session(token), "data")
            .await?
            .map(|raw| serde_json::from_str(&raw).context("Failed to decode session"))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn save(&self, token: &str, data: &SessionData) -> Result<()> {
        let raw = serde_json::to_string(data).context("Failed to encode session")?;
        self.store
            .set_object_field(&keys::session(token), "data", &raw)
            .await
    }

    /// Start a session for `uid`, returning its token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn create(&self, uid: Uid) -> Result<String> {
        let token = generate_session_token();
        self.save(
            &token,
            &SessionData {
                uid,
                ..SessionData::default()
            },
        )
        .await?;
        Ok(token)
    }
}
