//! Chat protocol layer for lobbyref.
//!
//! This crate knows how to read and speak the server's line protocol, and
//! nothing about lobbies or business rules:
//!
//! - **Messages** ([`Message`]): one parsed line, `source command params`.
//! - **Codec** ([`IrcLineCodec`]): frames the socket byte stream into
//!   messages for `FramedRead`.
//! - **Events** ([`Classifier`], [`Event`]): recognizes service-bot
//!   announcements and player commands inside ordinary chat lines.
//! - **Commands** ([`split_args`]): shell-style splitting of `!command`
//!   text.
//! - **Outbound** ([`Outbound`], [`MpCommand`]): everything we can say.
//!
//! # Architecture
//!
//! ```text
//! bytes → IrcLineCodec → Message → Classifier → Event → (referee)
//!                                                          │
//! socket ← writer ← Outbound::to_wire ←────────────────────┘
//! ```

mod codec;
mod command;
mod error;
mod event;
mod message;
mod outbound;

pub use codec::IrcLineCodec;
pub use command::split_args;
pub use error::ProtocolError;
pub use event::{BeatmapRef, Classifier, Event};
pub use message::Message;
pub use outbound::{MpCommand, Outbound};
