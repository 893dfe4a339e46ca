//! Unified error type for lobbyref.

use std::path::PathBuf;

use lobbyref_api::ApiError;
use lobbyref_protocol::ProtocolError;
use lobbyref_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LobbyrefError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The inbound stream broke while reading lines.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Setting up the metadata client failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad command-line arguments.
    #[error("{0}")]
    Usage(String),

    /// The lobby ended for a reason the session cannot recover from.
    #[error("{0}")]
    Lobby(String),

    /// The event-handling path panicked.
    #[error("session panicked: {0}")]
    Panicked(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting needed to connect is empty.
    #[error("missing setting: {0}")]
    Missing(&'static str),
}
