//! OAuth access token cache.
//!
//! The API uses the client-credentials flow: we trade the client id and
//! secret for a bearer token that lasts about a day. Requesting a new one
//! on every call would be slow and rude, so the token is kept:
//!
//! - in memory, behind an async mutex, so concurrent fetches share one
//!   token and at most one refresh runs at a time;
//! - on disk (a small JSON file), so a restart does not need a new token.
//!
//! A token counts as expired [`EXPIRY_MARGIN_SECS`] before its real
//! expiry, so a request never leaves with a token that dies in flight.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::ApiError;

/// Seconds before expiry at which a token is treated as expired.
pub const EXPIRY_MARGIN_SECS: u64 = 60;

/// A bearer token and when it stops working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Expiry, in seconds since the Unix epoch. Wall-clock time because the
    /// token outlives the process.
    pub expires_at: u64,
}

impl Token {
    /// A token that expires `expires_in` seconds from now.
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: unix_now().saturating_add(expires_in),
        }
    }

    /// Whether the token is usable at `now` (Unix seconds).
    pub fn is_valid_at(&self, now: u64) -> bool {
        !self.access_token.is_empty()
            && now.saturating_add(EXPIRY_MARGIN_SECS) < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// TokenCache
// ---------------------------------------------------------------------------

/// Shared token store with optional file persistence.
#[derive(Debug, Default)]
pub struct TokenCache {
    path: Option<PathBuf>,
    current: Mutex<Option<Token>>,
}

impl TokenCache {
    /// A cache that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A cache backed by `path`. An existing file is loaded now; a missing
    /// or unreadable one just means the first call fetches a token.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = read_token(&path);
        Self {
            path: Some(path),
            current: Mutex::new(current),
        }
    }

    /// Returns the cached token if still valid, otherwise runs `refresh`,
    /// stores its result, and returns that.
    ///
    /// The lock is held across `refresh`, so callers racing on an expired
    /// token wait for one refresh instead of each starting their own.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Token, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Token, ApiError>>,
    {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        let token = refresh().await?;
        tracing::info!(target: "api", expires_at = token.expires_at, "refreshed api token");
        if let Some(path) = &self.path {
            write_token(path, &token);
        }
        *current = Some(token.clone());
        Ok(token)
    }

    /// Drops the in-memory token, e.g. after the server rejected it.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    /// The cached token, valid or not.
    pub async fn peek(&self) -> Option<Token> {
        self.current.lock().await.clone()
    }
}

fn read_token(path: &Path) -> Option<Token> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read token cache");
            return None;
        }
    };
    match serde_json::from_slice(&data) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt token cache");
            None
        }
    }
}

/// Persists the token. Failure only costs a refresh after restart, so it
/// is logged rather than returned.
fn write_token(path: &Path, token: &Token) {
    let result = (|| -> std::io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_vec_pretty(token)?;
        std::fs::write(path, data)
    })();
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "could not write token cache");
    }
}
