use lobbyref_api::BeatmapInfo;
use serde::Serialize;

use crate::LobbyPhase;

/// A read-only copy of the lobby, for the status page and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbySnapshot {
    pub channel: Option<String>,
    pub phase: LobbyPhase,
    /// Display order: who hosts next first, the current host last.
    pub queue: Vec<String>,
    pub host: Option<String>,
    pub queue_defined: bool,
    pub current_beatmap: Option<BeatmapInfo>,
    pub match_in_progress: bool,
    pub host_rotation: bool,
    pub difficulty_constraint: bool,
    pub difficulty_range: [f64; 2],
}
