//! Transport layer for lobbyref.
//!
//! Two pieces live here:
//!
//! - [`TcpConnection`] opens the chat server socket and hands out its
//!   read and write halves.
//! - [`spawn_writer`] starts the rate-limited writer. Every outbound line goes
//!   through an [`Outbox`] and is written to the socket no faster than the
//!   server's message-rate limit allows.
//!
//! The transport knows nothing about the chat protocol. It moves lines of
//! bytes; framing and parsing belong to `lobbyref-protocol`.

mod error;
mod tcp;
mod writer;

pub use error::TransportError;
pub use tcp::TcpConnection;
pub use writer::{spawn_writer, Outbox, OutboxReceiver, WriterConfig, WriterTask};
