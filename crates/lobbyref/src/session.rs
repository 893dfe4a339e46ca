//! One connection to the chat server, from login to exit.
//!
//! The session owns the read half of the socket and the writer task. Every
//! inbound line is parsed, answered if it is a `PING`, classified, and
//! handed to the [`Lobby`]. After each event the remembered channel is
//! written to the cache file if it changed.

use std::future::Future;

use futures_util::StreamExt;
use lobbyref_api::MetadataSource;
use lobbyref_protocol::{Classifier, IrcLineCodec, Message, Outbound};
use lobbyref_referee::Lobby;
use lobbyref_transport::{Outbox, TransportError, WriterConfig, WriterTask, spawn_writer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

use crate::{CacheFile, Config, LobbyrefError};

/// Why [`Session::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The lobby was closed (by us, the operator or the server).
    Closed,
    /// The interrupt future resolved first.
    Interrupted,
}

pub struct Session<R, M: MetadataSource> {
    reader: FramedRead<R, IrcLineCodec>,
    classifier: Classifier,
    lobby: Lobby<M>,
    outbox: Outbox,
    writer: WriterTask,
    remembered: watch::Receiver<Option<String>>,
    cache: CacheFile,
}

impl<R, M> Session<R, M>
where
    R: AsyncRead + Unpin,
    M: MetadataSource,
{
    /// Wires a lobby to the two socket halves. `remembered` is the lobby to
    /// rejoin after login, if any.
    pub fn new<W>(
        reader: R,
        writer: W,
        config: &Config,
        source: M,
        cache: CacheFile,
        remembered: Option<String>,
    ) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbox, writer) = spawn_writer(writer, WriterConfig::with_rate(config.irc.rate_limit));
        let lobby = Lobby::new(config.referee(), remembered, source, outbox.clone());
        let mut remembered = lobby.remembered();
        remembered.mark_unchanged();

        Self {
            reader: FramedRead::new(reader, IrcLineCodec::new()),
            classifier: Classifier::new(config.lobby.service_bot.clone())
                .with_nick(config.irc.username.clone()),
            lobby,
            outbox,
            writer,
            remembered,
            cache,
        }
    }

    pub fn lobby(&self) -> &Lobby<M> {
        &self.lobby
    }

    /// Queues `PASS` and `NICK`.
    pub fn login(&self, username: &str, password: &str) -> Result<(), LobbyrefError> {
        tracing::info!(%username, "logging in");
        self.send(&Outbound::Pass(password.to_string()))?;
        self.send(&Outbound::Nick(username.to_string()))?;
        Ok(())
    }

    /// Reads and handles lines until the lobby closes, the connection drops
    /// or `interrupt` resolves.
    ///
    /// A lobby that closed because of a failure (rejected login, no lobby
    /// to join) is reported as [`LobbyrefError::Lobby`].
    pub async fn run<F: Future>(&mut self, interrupt: F) -> Result<Exit, LobbyrefError> {
        tokio::pin!(interrupt);

        loop {
            let next = tokio::select! {
                next = self.reader.next() => next,
                _ = &mut interrupt => return Ok(Exit::Interrupted),
            };
            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(closed("server closed the connection")),
            };

            if self.answer_ping(&msg)? {
                continue;
            }
            let Some(event) = self.classifier.classify(&msg) else {
                continue;
            };
            tracing::trace!(kind = event.kind(), "event");

            let phase = self.lobby.handle(event).await;
            self.persist_remembered();

            if phase.is_closed() {
                return match self.lobby.failure().await {
                    Some(reason) => Err(LobbyrefError::Lobby(reason)),
                    None => Ok(Exit::Closed),
                };
            }
            if self.writer.is_finished() {
                return Err(closed("writer stopped"));
            }
        }
    }

    /// Abandons pending lookups and flushes queued lines. Returns how many
    /// lines the writer sent in total.
    pub async fn finish(self) -> Result<u64, LobbyrefError> {
        self.lobby.close();
        let written = self.writer.finish().await?;
        tracing::debug!(written, "writer finished");
        Ok(written)
    }

    fn answer_ping(&self, msg: &Message) -> Result<bool, LobbyrefError> {
        if msg.command != "PING" {
            return Ok(false);
        }
        let token = msg.param(0).unwrap_or_default();
        self.send(&Outbound::Pong(token.to_string()))?;
        Ok(true)
    }

    fn persist_remembered(&mut self) {
        if !self.remembered.has_changed().unwrap_or(false) {
            return;
        }
        let lobby = self.remembered.borrow_and_update().clone();
        match self.cache.set_lobby(lobby) {
            Ok(()) => tracing::debug!(lobby = ?self.cache.lobby(), "cache updated"),
            Err(e) => tracing::warn!(
                path = %self.cache.path().display(),
                error = %e,
                "cannot write cache file"
            ),
        }
    }

    fn send(&self, command: &Outbound) -> Result<(), LobbyrefError> {
        tracing::debug!(target: "irc", "> {command}");
        self.outbox.send_line(&command.to_wire())?;
        Ok(())
    }
}

fn closed(reason: &str) -> LobbyrefError {
    TransportError::ConnectionClosed(reason.to_string()).into()
}
