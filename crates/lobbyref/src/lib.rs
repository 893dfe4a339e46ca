//! # lobbyref
//!
//! Automated referee for osu! multiplayer lobbies.
//!
//! The bot logs in to the game's chat server, creates (or rejoins) a
//! lobby and keeps it running on its own: hosts rotate after every match,
//! beatmaps outside the allowed star range are reverted, and players vote
//! to skip a host or start a match.
//!
//! ```text
//! TcpConnection ─read─→ Session ─Event─→ Lobby ─Outbound─→ writer ─→ socket
//!                          │               │
//!                      CacheFile      MetadataSource (ApiClient)
//! ```
//!
//! This crate holds the process around the referee: [`Config`], the
//! [`Session`] loop, the remembered-lobby [`CacheFile`], the crash record
//! and an optional status page.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod crash;
pub mod dashboard;
mod error;
pub mod logging;
pub mod session;
pub mod shutdown;

pub use cache::{Cache, CacheFile};
pub use cli::{Cli, USAGE};
pub use config::{Config, DashboardConfig, IrcConfig, PathsConfig};
pub use error::{ConfigError, LobbyrefError};
pub use session::{Exit, Session};
