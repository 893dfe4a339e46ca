//! Rate-limited outbound writer.
//!
//! The chat server disconnects clients that talk too fast, so every line
//! leaves through a single pacing task:
//!
//! ```text
//! reader loop ──┐
//!               ├──→ Outbox (mpsc, FIFO) ──→ writer task ──(≤ 1 line / interval)──→ socket
//! fetch tasks ──┘
//! ```
//!
//! The first line goes out immediately; every following line waits until at
//! least one interval has passed since the previous write. Nothing is ever
//! dropped and order is preserved.
//!
//! Shutdown comes in two flavours:
//! - [`WriterTask::finish`] stops accepting new lines, writes what is
//!   already queued (still paced), then ends.
//! - [`WriterTask::abort`] discards the queue and ends immediately.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::TransportError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Pacing configuration for the writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriterConfig {
    /// Maximum lines per second. Must be positive.
    pub rate_limit: f64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { rate_limit: 1.0 }
    }
}

impl WriterConfig {
    /// Creates a config for the given rate (lines per second).
    pub fn with_rate(rate_limit: f64) -> Self {
        Self { rate_limit }
    }

    /// Replaces a non-positive or non-finite rate with the default.
    pub fn validated(mut self) -> Self {
        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            tracing::warn!(
                rate = self.rate_limit,
                "invalid writer rate limit, using default"
            );
            self.rate_limit = Self::default().rate_limit;
        }
        self
    }

    /// Minimum spacing between two writes (`1 / rate_limit`).
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_limit)
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Cloneable handle for queueing outbound lines.
///
/// Held by the session's reader loop and by every background task that
/// needs to talk to the server.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Outbox {
    /// Creates an outbox that is not attached to a writer task.
    ///
    /// Whatever is sent can be read back from the returned receiver, which
    /// makes it the natural sink for tests of code that produces lines.
    pub fn detached() -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, OutboxReceiver { rx })
    }

    /// Queues a raw payload as-is.
    pub fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.tx.send(payload).map_err(|_| TransportError::Shutdown)
    }

    /// Queues one protocol line, appending the `\n` terminator.
    pub fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        self.send(payload)
    }

    /// Returns `true` once the writer stopped accepting lines.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving end of a [`detached`](Outbox::detached) outbox.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl OutboxReceiver {
    /// Waits for the next line, without its terminator.
    ///
    /// Returns `None` once every [`Outbox`] clone has been dropped.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.rx.recv().await.map(into_line)
    }

    /// Takes every line queued so far without waiting.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(payload) = self.rx.try_recv() {
            lines.push(into_line(payload));
        }
        lines
    }
}

fn into_line(payload: Vec<u8>) -> String {
    let text = String::from_utf8_lossy(&payload);
    text.trim_end_matches(['\r', '\n']).to_string()
}

// ---------------------------------------------------------------------------
// Writer task
// ---------------------------------------------------------------------------

/// Handle to the running writer task.
#[derive(Debug)]
pub struct WriterTask {
    drain: watch::Sender<bool>,
    handle: JoinHandle<Result<u64, TransportError>>,
}

impl WriterTask {
    /// Stops accepting lines, writes everything already queued, and waits
    /// for the task to end. Returns the total number of lines written.
    pub async fn finish(self) -> Result<u64, TransportError> {
        let _ = self.drain.send(true);
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "writer task did not complete");
                Err(TransportError::Shutdown)
            }
        }
    }

    /// Discards anything still queued and stops the task.
    pub async fn abort(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Returns `true` if the task already ended (e.g. after a write error).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns the pacing task writing to `sink` and returns its outbox.
pub fn spawn_writer<W>(sink: W, config: WriterConfig) -> (Outbox, WriterTask)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let config = config.validated();
    let (tx, rx) = mpsc::unbounded_channel();
    let (drain_tx, drain_rx) = watch::channel(false);

    tracing::debug!(
        rate = config.rate_limit,
        interval_ms = config.interval().as_secs_f64() * 1000.0,
        "writer started"
    );

    let handle = tokio::spawn(run(sink, rx, drain_rx, config.interval()));
    (
        Outbox { tx },
        WriterTask {
            drain: drain_tx,
            handle,
        },
    )
}

async fn run<W>(
    mut sink: W,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut drain: watch::Receiver<bool>,
    interval: Duration,
) -> Result<u64, TransportError>
where
    W: AsyncWrite + Unpin,
{
    // `Delay` keeps consecutive ticks at least one interval apart even
    // after the queue sat idle for a while.
    let mut pacer = time::interval(interval);
    pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut draining = false;
    let mut written = 0u64;

    loop {
        let next = tokio::select! {
            next = rx.recv() => next,
            // A dropped `WriterTask` counts as a drain request too.
            _ = drain.changed(), if !draining => {
                draining = true;
                rx.close();
                tracing::debug!(pending = rx.len(), "writer draining");
                continue;
            }
        };

        let Some(payload) = next else { break };

        pacer.tick().await;
        sink.write_all(&payload)
            .await
            .map_err(TransportError::SendFailed)?;
        sink.flush().await.map_err(TransportError::SendFailed)?;
        written += 1;
        tracing::trace!(target: "irc", bytes = payload.len(), "line written");
    }

    let _ = sink.shutdown().await;
    tracing::debug!(written, "writer stopped");
    Ok(written)
}
