//! The host-rotation queue.
//!
//! Index 0 is always the current (or next) host. Rotation moves the host
//! to the back, so the printed order starts at index 1: "who comes after
//! the current host".

use serde::Serialize;

use crate::RefereeError;

/// A player in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub name: String,
    /// Never picked as host by rotation.
    pub autoskip: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            autoskip: false,
        }
    }
}

/// Ordered, duplicate-free list of players.
///
/// Names compare case-insensitively, matching how the chat server treats
/// nicknames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    players: Vec<Player>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a queue in the given order, dropping duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = Self::new();
        for name in names {
            queue.push(name);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The current host.
    pub fn head(&self) -> Option<&Player> {
        self.players.first()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether `name` is the current host.
    pub fn is_head(&self, name: &str) -> bool {
        self.head().is_some_and(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Appends a player at the tail. Returns `false` if already queued.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.players.push(Player::new(name));
        true
    }

    /// Removes a player, keeping everyone else in order. Returns the
    /// index they had.
    pub fn remove(&mut self, name: &str) -> Option<(usize, Player)> {
        let index = self.position(name)?;
        Some((index, self.players.remove(index)))
    }

    /// Makes the first player at index ≥ 1 without autoskip the new head by
    /// moving everyone before them to the tail.
    ///
    /// Returns `false` (and changes nothing) if there is no such player.
    pub fn rotate(&mut self) -> bool {
        let Some(next) = self
            .players
            .iter()
            .skip(1)
            .position(|p| !p.autoskip)
            .map(|i| i + 1)
        else {
            return false;
        };
        self.players.rotate_left(next);
        true
    }

    /// Moves `name` to index 0. The previous head ends up right after them.
    pub fn promote(&mut self, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        let player = self.players.remove(index);
        self.players.insert(0, player);
        true
    }

    /// Flips a player's autoskip flag and returns the new value.
    pub fn toggle_autoskip(&mut self, name: &str) -> Option<bool> {
        let index = self.position(name)?;
        let player = &mut self.players[index];
        player.autoskip = !player.autoskip;
        Some(player.autoskip)
    }

    /// Reorders the queue from name queries (operator `!q a b c`).
    ///
    /// Each query is resolved against the players not yet placed. Resolved
    /// players go first, in query order; everyone else follows in their
    /// current order. Queries that fail to resolve are returned and skipped.
    pub fn reorder<S: AsRef<str>>(&mut self, queries: &[S]) -> Vec<RefereeError> {
        let mut remaining = std::mem::take(&mut self.players);
        let mut placed = Vec::with_capacity(remaining.len());
        let mut errors = Vec::new();

        for query in queries {
            let names: Vec<&str> = remaining.iter().map(|p| p.name.as_str()).collect();
            match resolve_name(query.as_ref(), &names) {
                Ok(index) => placed.push(remaining.remove(index)),
                Err(e) => errors.push(e),
            }
        }

        placed.append(&mut remaining);
        self.players = placed;
        errors
    }

    /// Names in display order: index 1..end, then index 0.
    pub fn display_order(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.players.iter().skip(1).map(|p| p.name.as_str()).collect();
        if let Some(head) = self.head() {
            names.push(&head.name);
        }
        names
    }
}

/// Resolves a name query against `candidates` by case-insensitive prefix.
///
/// An exact (case-insensitive) match wins outright, so `"bob"` picks `Bob`
/// even when `Bobby` is also present. Otherwise exactly one prefix match
/// is required.
pub fn resolve_name(query: &str, candidates: &[&str]) -> Result<usize, RefereeError> {
    let query_lower = query.to_lowercase();
    if let Some(index) = candidates
        .iter()
        .position(|c| c.to_lowercase() == query_lower)
    {
        return Ok(index);
    }

    let matches: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.to_lowercase().starts_with(&query_lower))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(RefereeError::NoMatch(query.to_string())),
        _ => Err(RefereeError::Ambiguous {
            query: query.to_string(),
            candidates: matches.iter().map(|&i| candidates[i].to_string()).collect(),
        }),
    }
}
