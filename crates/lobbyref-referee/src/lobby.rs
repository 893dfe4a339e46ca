//! The lobby controller: [`LobbyState`] behind a lock, wired to the writer
//! and the metadata source.
//!
//! The session's reader loop calls [`Lobby::handle`] for every event. The
//! state machine's effects run right there, while the lock is still held,
//! so lines reach the writer in the order the rules produced them.
//! Metadata lookups run as background tasks and merge their result under
//! the same lock when they finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use lobbyref_api::MetadataSource;
use lobbyref_protocol::{Event, Outbound};
use lobbyref_transport::Outbox;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::state::{Effect, LobbyState};
use crate::{LobbyPhase, LobbySnapshot, RefereeConfig};

/// Handle to a lobby controller. Clones share the same lobby.
pub struct Lobby<M: MetadataSource> {
    shared: Arc<Shared<M>>,
}

struct Shared<M> {
    state: Mutex<LobbyState>,
    source: M,
    outbox: Outbox,
    remembered: watch::Sender<Option<String>>,
    tasks: std::sync::Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl<M: MetadataSource> Clone for Lobby<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: MetadataSource> Lobby<M> {
    pub fn new(
        config: RefereeConfig,
        remembered: Option<String>,
        source: M,
        outbox: Outbox,
    ) -> Self {
        let (remembered_tx, _) = watch::channel(remembered.clone());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LobbyState::new(config, remembered)),
                source,
                outbox,
                remembered: remembered_tx,
                tasks: std::sync::Mutex::new(JoinSet::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Applies one event and carries out its effects. Returns the phase
    /// afterwards.
    pub async fn handle(&self, event: Event) -> LobbyPhase {
        let mut state = self.shared.state.lock().await;
        let effects = state.apply(event, Instant::now());
        self.execute(&state, effects);
        state.phase()
    }

    pub async fn snapshot(&self) -> LobbySnapshot {
        self.shared.state.lock().await.snapshot()
    }

    pub async fn phase(&self) -> LobbyPhase {
        self.shared.state.lock().await.phase()
    }

    /// Why the lobby ended, when it ended badly.
    pub async fn failure(&self) -> Option<String> {
        self.shared.state.lock().await.failure().map(String::from)
    }

    /// Watches the channel to rejoin next time.
    pub fn remembered(&self) -> watch::Receiver<Option<String>> {
        self.shared.remembered.subscribe()
    }

    /// Sends `!mp close` if we are in a lobby. Returns whether it did.
    pub async fn request_close(&self) -> bool {
        let state = self.shared.state.lock().await;
        let Some(command) = state.close_command() else {
            return false;
        };
        tracing::info!("closing lobby");
        self.send(&command);
        true
    }

    /// Best-effort chat message to the lobby. Never waits and never
    /// panics; gives up if the state is busy or we are not in a lobby.
    pub fn notify(&self, text: &str) {
        let Ok(state) = self.shared.state.try_lock() else {
            return;
        };
        if let Some(channel) = state.channel() {
            self.send(&Outbound::privmsg(channel, text));
        }
    }

    /// Stops outstanding lookups. A lookup that finishes anyway is not
    /// merged.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.tasks().abort_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Waits until every lookup started so far (and any they started) has
    /// finished.
    pub async fn wait_pending(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.tasks());
            if set.is_empty() {
                return;
            }
            while let Some(result) = set.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::error!(error = %e, "lookup task panicked");
                    }
                }
            }
        }
    }

    // -- Effects ----------------------------------------------------------

    fn execute(&self, state: &LobbyState, effects: Vec<Effect>) {
        let timeout = state.config().fetch_timeout;
        for effect in effects {
            match effect {
                Effect::Send(command) => self.send(&command),
                Effect::FetchBeatmap(id) => self.fetch_beatmap(id, timeout),
                Effect::FetchUser(name) => self.fetch_user(name, timeout),
                Effect::Remember(channel) => {
                    self.shared.remembered.send_replace(channel);
                }
            }
        }
    }

    fn send(&self, command: &Outbound) {
        tracing::debug!(target: "irc", "> {command}");
        if let Err(e) = self.shared.outbox.send_line(&command.to_wire()) {
            tracing::warn!(error = %e, "dropping outbound line");
        }
    }

    fn fetch_beatmap(&self, id: u64, timeout: Duration) {
        let lobby = self.clone();
        self.spawn(async move {
            let result = lobby.shared.source.fetch_beatmap(id, timeout).await;

            let mut state = lobby.shared.state.lock().await;
            if lobby.is_closed() {
                return;
            }
            match result {
                Ok(info) => {
                    let effects = state.merge_beatmap(info);
                    lobby.execute(&state, effects);
                }
                Err(e) => {
                    tracing::warn!(beatmap_id = id, error = %e, "beatmap lookup failed");
                    state.beatmap_fetch_failed(id);
                }
            }
        });
    }

    fn fetch_user(&self, name: String, timeout: Duration) {
        let lobby = self.clone();
        self.spawn(async move {
            match lobby.shared.source.fetch_user(&name, timeout).await {
                Ok(profile) => tracing::info!(
                    player = %profile.username,
                    id = profile.id,
                    country = %profile.country_code,
                    online = profile.is_online,
                    "player profile"
                ),
                Err(e) => tracing::warn!(player = %name, error = %e, "profile lookup failed"),
            }
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return;
        }
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
