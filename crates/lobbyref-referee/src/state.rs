//! The lobby state machine.
//!
//! [`LobbyState`] is pure: it takes one [`Event`] at a time and returns the
//! [`Effect`]s the outside world should carry out (lines to send, lookups
//! to start, the remembered channel to persist). It never blocks, spawns
//! or reads the clock; the caller passes `now` in. That keeps every rule
//! testable without a socket or a runtime.

use lobbyref_api::BeatmapInfo;
use lobbyref_protocol::{Event, MpCommand, Outbound};
use tokio::time::Instant;

use crate::votes::VoteBox;
use crate::{LobbyPhase, LobbySnapshot, Queue, RefereeConfig};

/// Something the state machine wants done.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Queue a line for the writer.
    Send(Outbound),
    /// Look up beatmap metadata and feed it back through
    /// [`LobbyState::merge_beatmap`].
    FetchBeatmap(u64),
    /// Look up a player's profile (logged only).
    FetchUser(String),
    /// The channel to rejoin on the next start changed.
    Remember(Option<String>),
}

/// Everything the referee knows about its lobby.
#[derive(Debug, Clone)]
pub struct LobbyState {
    pub(crate) config: RefereeConfig,
    pub(crate) phase: LobbyPhase,
    pub(crate) channel: Option<String>,
    pub(crate) remembered: Option<String>,
    pub(crate) queue: Queue,
    /// `false` after rejoining a lobby whose rotation order we cannot know.
    pub(crate) queue_defined: bool,
    pub(crate) current_beatmap: Option<BeatmapInfo>,
    /// Beatmap id whose lookup is in flight. Older results are stale.
    pub(crate) pending_beatmap: Option<u64>,
    pub(crate) match_started_at: Option<Instant>,
    pub(crate) skip_votes: VoteBox,
    pub(crate) start_votes: VoteBox,
    /// Host we last assigned, until the service bot confirms it.
    pub(crate) awaiting_host: Option<String>,
    pub(crate) failure: Option<String>,
}

impl LobbyState {
    /// A controller that has just connected. `remembered` is the lobby
    /// channel to rejoin, if any.
    pub fn new(config: RefereeConfig, remembered: Option<String>) -> Self {
        Self {
            config,
            phase: LobbyPhase::AwaitingAuth,
            channel: None,
            remembered,
            queue: Queue::new(),
            queue_defined: true,
            current_beatmap: None,
            pending_beatmap: None,
            match_started_at: None,
            skip_votes: VoteBox::default(),
            start_votes: VoteBox::default(),
            awaiting_host: None,
            failure: None,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn phase(&self) -> LobbyPhase {
        self.phase
    }

    pub fn config(&self) -> &RefereeConfig {
        &self.config
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn remembered(&self) -> Option<&str> {
        self.remembered.as_deref()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn queue_defined(&self) -> bool {
        self.queue_defined
    }

    pub fn current_beatmap(&self) -> Option<&BeatmapInfo> {
        self.current_beatmap.as_ref()
    }

    pub fn match_in_progress(&self) -> bool {
        self.phase == LobbyPhase::MatchInProgress
    }

    /// Why the session cannot continue (login rejected, lobby gone).
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            channel: self.channel.clone(),
            phase: self.phase,
            queue: self.queue.display_order().into_iter().map(String::from).collect(),
            host: self.queue.head().map(|p| p.name.clone()),
            queue_defined: self.queue_defined,
            current_beatmap: self.current_beatmap.clone(),
            match_in_progress: self.match_in_progress(),
            host_rotation: self.config.host_rotation.enabled,
            difficulty_constraint: self.config.difficulty.enabled,
            difficulty_range: self.config.difficulty.range,
        }
    }

    // -- Event handling ---------------------------------------------------

    /// Applies one event and returns what to do about it.
    pub fn apply(&mut self, event: Event, now: Instant) -> Vec<Effect> {
        let mut out = Vec::new();

        if self.phase.is_closed() {
            tracing::trace!(kind = event.kind(), "lobby closed, ignoring event");
            return out;
        }
        if let (Some(ours), Some(theirs)) = (self.channel.as_deref(), event.channel()) {
            if !ours.eq_ignore_ascii_case(theirs) {
                tracing::trace!(channel = %theirs, kind = event.kind(), "ignoring event for another channel");
                return out;
            }
        }

        match event {
            Event::Authenticated => self.on_authenticated(&mut out),
            Event::AuthError(reason) => {
                tracing::error!(%reason, "login rejected");
                self.fail(format!("login rejected: {reason}"));
            }
            Event::JoinError(reason) => self.on_join_error(reason, &mut out),
            Event::Joined { channel, players } => self.on_joined(channel, players, &mut out),
            Event::Left { channel } => {
                tracing::info!(%channel, "left lobby");
                self.phase = LobbyPhase::Closed;
            }
            Event::Closed { channel } => {
                tracing::info!(%channel, "lobby closed");
                self.forget(&mut out);
                self.phase = LobbyPhase::Closed;
            }
            Event::UserJoined { name, slot, .. } => self.on_user_joined(name, slot, &mut out),
            Event::UserLeft { name, .. } => self.on_user_left(&name, &mut out),
            Event::HostChanged { name, .. } => self.on_host_changed(&name, &mut out),
            Event::BeatmapChanged { beatmap, .. } => {
                tracing::info!(
                    beatmap_id = beatmap.id,
                    "selected {} - {} [{}]",
                    beatmap.artist,
                    beatmap.title,
                    beatmap.version
                );
                self.pending_beatmap = Some(beatmap.id);
                out.push(Effect::FetchBeatmap(beatmap.id));
            }
            Event::AllReady { .. } => {
                tracing::info!("all players ready");
                self.mp(MpCommand::Start, &mut out);
            }
            Event::MatchStarted { .. } => {
                tracing::info!("match started");
                self.phase = LobbyPhase::MatchInProgress;
                self.match_started_at = Some(now);
                self.skip_votes.clear();
                self.start_votes.clear();
            }
            Event::MatchFinished { .. } => self.on_match_finished(&mut out),
            Event::MatchAborted { .. } => {
                tracing::info!("match aborted");
                self.end_match();
            }
            Event::UserMessage { sender, text, .. } => {
                tracing::info!(target: "chat", "{sender}: {text}");
            }
            Event::UserCommand {
                sender, name, args, ..
            } => {
                tracing::info!(target: "chat", "{sender}: !{name} {}", args.join(" "));
                self.run_command(&sender, &name, &args, now, &mut out);
            }
        }

        out
    }

    fn on_authenticated(&mut self, out: &mut Vec<Effect>) {
        if self.phase != LobbyPhase::AwaitingAuth {
            return;
        }
        self.phase = LobbyPhase::AwaitingJoin;
        match self.remembered.clone() {
            Some(channel) => {
                tracing::info!(%channel, "rejoining lobby");
                out.push(Effect::Send(Outbound::Join(channel)));
            }
            None => self.make_lobby(out),
        }
    }

    fn on_join_error(&mut self, reason: String, out: &mut Vec<Effect>) {
        if self.phase != LobbyPhase::AwaitingJoin {
            tracing::warn!(%reason, "join error outside of joining");
            return;
        }
        if self.remembered.is_some() {
            tracing::warn!(%reason, "remembered lobby is gone, creating a new one");
            self.forget(out);
            self.make_lobby(out);
        } else {
            tracing::error!(%reason, "could not join a lobby");
            self.fail(format!("could not join lobby: {reason}"));
        }
    }

    fn on_joined(&mut self, channel: String, players: Vec<String>, out: &mut Vec<Effect>) {
        if self.phase.in_lobby() {
            // The names reply repeats on some reconnect paths.
            tracing::debug!(%channel, "already in lobby");
            return;
        }

        let fresh = !self
            .remembered
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(&channel));
        tracing::info!(%channel, players = players.len(), fresh, "joined lobby");

        self.channel = Some(channel.clone());
        self.phase = LobbyPhase::Idle;
        self.queue = Queue::from_names(players);
        self.queue_defined = true;
        self.current_beatmap = None;
        self.pending_beatmap = None;
        self.match_started_at = None;
        self.skip_votes.clear();
        self.start_votes.clear();

        if fresh {
            self.remembered = Some(channel.clone());
            out.push(Effect::Remember(Some(channel)));
            self.mp(MpCommand::Password, out);
            self.mp(MpCommand::Size(self.config.lobby.size), out);
            let operator = self.operator();
            if !operator.is_empty() {
                self.mp(MpCommand::Invite(operator), out);
            }
        } else if self.queue.len() > 1 {
            self.queue_defined = false;
            self.config.host_rotation.enabled = false;
            tracing::warn!(players = self.queue.len(), "rejoined with unknown queue order");
            self.say(
                "Rejoined with players already here. Host rotation is off until the operator sets the order with !q.",
                out,
            );
        }
    }

    fn on_user_joined(&mut self, name: String, slot: u8, out: &mut Vec<Effect>) {
        tracing::info!(player = %name, slot, "player joined");
        let was_empty = self.queue.is_empty();
        if !self.queue.push(name.clone()) {
            return;
        }
        if was_empty {
            self.set_host(name.clone(), out);
        }
        if !self.queue_defined && self.queue.len() <= 1 {
            self.queue_defined = true;
        }
        out.push(Effect::FetchUser(name));
    }

    fn on_user_left(&mut self, name: &str, out: &mut Vec<Effect>) {
        let Some((index, player)) = self.queue.remove(name) else {
            tracing::debug!(player = %name, "unknown player left");
            return;
        };
        tracing::info!(player = %player.name, "player left");
        self.skip_votes.withdraw(name);
        self.start_votes.withdraw(name);
        if self
            .awaiting_host
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(name))
        {
            self.awaiting_host = None;
        }

        if let Some(head) = self.queue.head().map(|p| p.name.clone()) {
            if index == 0 && self.config.host_rotation.enabled {
                self.set_host(head, out);
            }
        } else {
            tracing::info!("lobby is empty, closing");
            self.mp(MpCommand::Close, out);
        }

        if !self.queue_defined && self.queue.len() <= 1 {
            self.queue_defined = true;
        }
    }

    fn on_host_changed(&mut self, name: &str, out: &mut Vec<Effect>) {
        // Any host change settles the pending assignment, confirmed or not.
        if self
            .awaiting_host
            .take()
            .is_some_and(|h| h.eq_ignore_ascii_case(name))
        {
            tracing::debug!(player = %name, "host assignment confirmed");
            return;
        }
        tracing::info!(player = %name, "host changed");

        if !self.config.host_rotation.enabled || !self.queue_defined || self.queue.is_head(name) {
            return;
        }
        let Some(expected) = self.queue.head().map(|p| p.name.clone()) else {
            return;
        };

        let allowed = self.config.host_rotation.allow_transfers;
        if !self.queue.contains(name) {
            if allowed {
                tracing::warn!(player = %name, "host moved to a player outside the queue");
            } else {
                self.set_host(expected, out);
            }
            return;
        }

        if allowed {
            self.queue.promote(name);
            self.skip_votes.clear();
            tracing::info!(from = %expected, to = %name, "host transferred");
            if self.config.host_rotation.report_transfers {
                self.say(format!("{expected} passed host to {name}."), out);
            }
        } else {
            tracing::info!(from = %expected, to = %name, "reverting host transfer");
            self.set_host(expected.clone(), out);
            self.say(
                format!("{expected}, passing host is disabled here. Use !skip to give up your turn."),
                out,
            );
        }
    }

    fn on_match_finished(&mut self, out: &mut Vec<Effect>) {
        tracing::info!("match finished");
        self.end_match();
        if self.config.host_rotation.enabled && self.queue_defined && self.rotate(out) {
            if self.config.host_rotation.print_queue_on_match_end {
                self.say(self.queue_line(), out);
            }
        }
    }

    // -- Fetch results ----------------------------------------------------

    /// Merges the result of a [`Effect::FetchBeatmap`] lookup.
    ///
    /// Results for a beatmap that is no longer the latest selection, or
    /// that arrive after the lobby closed, are dropped.
    pub fn merge_beatmap(&mut self, info: BeatmapInfo) -> Vec<Effect> {
        let mut out = Vec::new();
        if self.phase.is_closed() {
            return out;
        }
        if self.pending_beatmap != Some(info.id) {
            tracing::debug!(beatmap_id = info.id, "dropping stale beatmap lookup");
            return out;
        }
        self.pending_beatmap = None;

        let difficulty = &self.config.difficulty;
        if difficulty.enabled && !difficulty.allows(info.stars) {
            let range = difficulty.describe_range();
            let report = difficulty.report_violations;
            tracing::info!(beatmap_id = info.id, stars = info.stars, %range, "beatmap rejected");
            match self.current_beatmap.as_ref().map(|b| b.id) {
                Some(previous) => {
                    self.mp(MpCommand::Map(previous), &mut out);
                    if report {
                        self.say(
                            format!(
                                "{} - {} [{}] is {}*, outside the allowed {range}. Going back to the previous beatmap.",
                                info.artist,
                                info.title,
                                info.version,
                                crate::format_stars(info.stars),
                            ),
                            &mut out,
                        );
                    }
                }
                None => {
                    tracing::info!(beatmap_id = info.id, "no previous beatmap to go back to");
                }
            }
            return out;
        }

        tracing::info!(beatmap_id = info.id, stars = info.stars, "beatmap accepted");
        self.current_beatmap = Some(info);
        out
    }

    /// Notes that the lookup for `id` failed. The current beatmap is kept.
    pub fn beatmap_fetch_failed(&mut self, id: u64) {
        if self.pending_beatmap == Some(id) {
            self.pending_beatmap = None;
        }
    }

    /// The line that closes the lobby, if we are in one.
    pub fn close_command(&self) -> Option<Outbound> {
        if !self.phase.in_lobby() {
            return None;
        }
        let channel = self.channel.clone()?;
        Some(Outbound::mp(channel, MpCommand::Close))
    }

    // -- Helpers ----------------------------------------------------------

    /// The operator's nickname as it appears in chat.
    pub(crate) fn operator(&self) -> String {
        self.config.lobby.operator.replace(' ', "_")
    }

    pub(crate) fn is_operator(&self, name: &str) -> bool {
        let operator = self.operator();
        !operator.is_empty() && operator.eq_ignore_ascii_case(name)
    }

    /// Moves host to the next eligible player. Returns `false` if nobody
    /// else can take it.
    pub(crate) fn rotate(&mut self, out: &mut Vec<Effect>) -> bool {
        if !self.queue.rotate() {
            return false;
        }
        self.skip_votes.clear();
        if let Some(head) = self.queue.head().map(|p| p.name.clone()) {
            tracing::info!(player = %head, "host rotated");
            self.set_host(head, out);
        }
        true
    }

    pub(crate) fn set_host(&mut self, name: String, out: &mut Vec<Effect>) {
        self.awaiting_host = Some(name.clone());
        self.mp(MpCommand::Host(name), out);
    }

    /// `"Queue: B, C, A"` in display order.
    pub(crate) fn queue_line(&self) -> String {
        if self.queue.is_empty() {
            return "Queue is empty.".to_string();
        }
        let mut line = format!("Queue: {}", self.queue.display_order().join(", "));
        if !self.queue_defined {
            line.push_str(" (order unknown, set it with !q)");
        }
        line
    }

    pub(crate) fn mp(&self, command: MpCommand, out: &mut Vec<Effect>) {
        if let Some(channel) = &self.channel {
            out.push(Effect::Send(Outbound::mp(channel.clone(), command)));
        }
    }

    pub(crate) fn say(&self, text: impl Into<String>, out: &mut Vec<Effect>) {
        if let Some(channel) = &self.channel {
            out.push(Effect::Send(Outbound::privmsg(channel.clone(), text)));
        }
    }

    fn make_lobby(&self, out: &mut Vec<Effect>) {
        let name = self.config.lobby_name();
        tracing::info!(%name, "creating lobby");
        out.push(Effect::Send(Outbound::mp(
            self.config.lobby.service_bot.clone(),
            MpCommand::Make(name),
        )));
    }

    fn forget(&mut self, out: &mut Vec<Effect>) {
        if self.remembered.take().is_some() {
            out.push(Effect::Remember(None));
        }
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.phase = LobbyPhase::Closed;
    }

    fn end_match(&mut self) {
        if self.phase == LobbyPhase::MatchInProgress {
            self.phase = LobbyPhase::Idle;
        }
        self.match_started_at = None;
    }
}
