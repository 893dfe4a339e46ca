//! The TOML config file.
//!
//! Every section is optional and every field has a default, so a partial
//! file (or none at all) works:
//!
//! ```toml
//! [irc]
//! username = "referee"
//! password = "..."
//!
//! [difficulty]
//! range = [5.0, 6.5]
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lobbyref_api::ApiConfig;
use lobbyref_referee::{
    DifficultyConfig, HostRotationConfig, LobbyConfig, RefereeConfig, VotingConfig,
};
use serde::Deserialize;

use crate::ConfigError;

pub const DEFAULT_PATH: &str = "lobbyref.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[irc]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// `host:port` of the chat server.
    pub address: String,
    pub username: String,
    /// IRC password from the game's account settings.
    pub password: String,
    /// Lines per second the server tolerates.
    pub rate_limit: f64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            address: "irc.ppy.sh:6667".to_string(),
            username: String::new(),
            password: String::new(),
            rate_limit: 1.0,
        }
    }
}

/// `[dashboard]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub address: SocketAddr,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Remembered lobby, see [`crate::cache`].
    pub cache: PathBuf,
    pub crash_record: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache: PathBuf::from("cache.json"),
            crash_record: PathBuf::from("crash.log"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub irc: IrcConfig,
    pub api: ApiConfig,
    pub lobby: LobbyConfig,
    pub host_rotation: HostRotationConfig,
    pub difficulty: DifficultyConfig,
    pub voting: VotingConfig,
    pub dashboard: DashboardConfig,
    pub paths: PathsConfig,
}

impl Config {
    /// Reads and validates `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default().validated());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config.validated())
    }

    /// Fixes values that would break the referee instead of rejecting them.
    pub fn validated(mut self) -> Self {
        if !(self.irc.rate_limit.is_finite() && self.irc.rate_limit > 0.0) {
            tracing::warn!(rate_limit = self.irc.rate_limit, "invalid rate limit, using 1/s");
            self.irc.rate_limit = IrcConfig::default().rate_limit;
        }

        let voting = &mut self.voting;
        voting.skip_threshold = clamp_fraction(voting.skip_threshold);
        voting.start_threshold = clamp_fraction(voting.start_threshold);

        let [a, b] = self.difficulty.range;
        self.difficulty.range = [a.min(b), a.max(b)];

        if self.lobby.operator.is_empty() {
            self.lobby.operator = self.irc.username.clone();
        }
        self
    }

    /// Fails if the settings needed to log in are missing.
    pub fn require_login(&self) -> Result<(), ConfigError> {
        if self.irc.username.is_empty() {
            return Err(ConfigError::Missing("irc.username"));
        }
        if self.irc.password.is_empty() {
            return Err(ConfigError::Missing("irc.password"));
        }
        Ok(())
    }

    /// The referee's share of the settings.
    pub fn referee(&self) -> RefereeConfig {
        RefereeConfig {
            lobby: self.lobby.clone(),
            host_rotation: self.host_rotation.clone(),
            difficulty: self.difficulty.clone(),
            voting: self.voting.clone(),
            fetch_timeout: self.api.timeout().max(Duration::from_millis(100)),
        }
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        return VotingConfig::default().skip_threshold;
    }
    value.clamp(0.0, 1.0)
}
