//! The remembered lobby, persisted between runs.
//!
//! ```json
//! { "lobby": "#mp_123" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Contents of the cache file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub lobby: Option<String>,
}

/// A [`Cache`] tied to its file.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
    cache: Cache,
}

impl CacheFile {
    /// Reads `path`. A missing or unreadable file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt cache file");
                Cache::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Cache::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read cache file");
                Cache::default()
            }
        };
        Self { path, cache }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lobby(&self) -> Option<&str> {
        self.cache.lobby.as_deref()
    }

    /// Records the lobby to rejoin and rewrites the file.
    pub fn set_lobby(&mut self, lobby: Option<String>) -> std::io::Result<()> {
        self.cache.lobby = lobby;
        self.save()
    }

    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.cache).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, bytes)
    }
}
