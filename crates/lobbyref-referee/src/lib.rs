//! Lobby controller for lobbyref.
//!
//! Consumes classified [`Event`](lobbyref_protocol::Event)s and keeps the
//! lobby in order: the host-rotation queue, the difficulty gate on beatmap
//! picks, skip and start votes, and the chat commands that drive them.
//!
//! # Key types
//!
//! - [`Lobby`]: the controller. One `handle(event)` entry point; owns the
//!   state lock, the outbox and the metadata lookups.
//! - [`LobbyState`]: the pure state machine behind it, returning
//!   [`Effect`]s instead of doing I/O.
//! - [`Queue`]: rotation order, index 0 is the host.
//! - [`RefereeConfig`]: settings, some of which chat commands change live.
//! - [`LobbyPhase`]: lifecycle state machine.

mod commands;
mod config;
mod error;
mod lobby;
mod queue;
mod snapshot;
mod state;
mod votes;

pub use commands::ChatCommand;
pub use config::{
    format_stars, DifficultyConfig, HostRotationConfig, InterruptAction, LobbyConfig, LobbyPhase,
    RefereeConfig, VotingConfig,
};
pub use error::RefereeError;
pub use lobby::Lobby;
pub use queue::{resolve_name, Player, Queue};
pub use snapshot::LobbySnapshot;
pub use state::{Effect, LobbyState};
pub use votes::{votes_needed, VoteBox};
