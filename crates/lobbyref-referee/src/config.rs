//! Referee configuration and lobby lifecycle state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

/// `[lobby]`: identity and setup of the lobby itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// The human running the bot. Gets invited to fresh lobbies and may use
    /// operator-only commands. Empty means "same as the IRC username".
    pub operator: String,
    /// Nickname of the service bot that announces lobby events.
    pub service_bot: String,
    /// Number of slots set on a fresh lobby.
    pub size: u8,
    /// Lobby name; `{min}` and `{max}` become the difficulty range.
    pub name_template: String,
    /// Rename the lobby when the difficulty settings change.
    pub auto_update_name: bool,
    /// What Ctrl-C does to the lobby.
    pub on_interrupt: InterruptAction,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            operator: String::new(),
            service_bot: "BanchoBot".to_string(),
            size: 8,
            name_template: "{min}-{max}* | Auto Host Rotate".to_string(),
            auto_update_name: true,
            on_interrupt: InterruptAction::Prompt,
        }
    }
}

/// Lobby handling on interrupt (Ctrl-C / SIGTERM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptAction {
    /// Close the lobby before exiting.
    Close,
    /// Leave the lobby open; it can be rejoined on the next start.
    Keep,
    /// Ask on stdin.
    Prompt,
}

/// `[host_rotation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostRotationConfig {
    pub enabled: bool,
    /// Let the host hand the role to someone else with the game's own
    /// host button. When off, such transfers are reverted.
    pub allow_transfers: bool,
    /// Announce accepted host transfers in the lobby.
    pub report_transfers: bool,
    pub print_queue_on_match_end: bool,
}

impl Default for HostRotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_transfers: false,
            report_transfers: true,
            print_queue_on_match_end: true,
        }
    }
}

/// `[difficulty]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub enabled: bool,
    /// Allowed star rating, inclusive: `[min, max]`.
    pub range: [f64; 2],
    /// Announce rejected beatmaps in the lobby.
    pub report_violations: bool,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            range: [4.0, 6.0],
            report_violations: true,
        }
    }
}

impl DifficultyConfig {
    pub fn min(&self) -> f64 {
        self.range[0]
    }

    pub fn max(&self) -> f64 {
        self.range[1]
    }

    /// Whether `stars` lies inside the range (bounds included).
    pub fn allows(&self, stars: f64) -> bool {
        stars >= self.min() && stars <= self.max()
    }

    /// `"4-6.5*"`
    pub fn describe_range(&self) -> String {
        format!("{}-{}*", format_stars(self.min()), format_stars(self.max()))
    }
}

/// `[voting]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    pub enabled: bool,
    /// Fraction of players (0..=1) needed to skip the host.
    pub skip_threshold: f64,
    /// Fraction of players (0..=1) needed to start the match.
    pub start_threshold: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_threshold: 0.75,
            start_threshold: 0.75,
        }
    }
}

// ---------------------------------------------------------------------------
// RefereeConfig
// ---------------------------------------------------------------------------

/// Everything the lobby controller needs to know about its settings.
///
/// The host rotation and difficulty sections are live: operator commands
/// (`!hr`, `!dc`, `!dcr`, `!pq`) change the controller's copy at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct RefereeConfig {
    pub lobby: LobbyConfig,
    pub host_rotation: HostRotationConfig,
    pub difficulty: DifficultyConfig,
    pub voting: VotingConfig,
    /// Upper bound for one metadata lookup.
    pub fetch_timeout: Duration,
}

impl Default for RefereeConfig {
    fn default() -> Self {
        Self {
            lobby: LobbyConfig::default(),
            host_rotation: HostRotationConfig::default(),
            difficulty: DifficultyConfig::default(),
            voting: VotingConfig::default(),
            fetch_timeout: Duration::from_secs(3),
        }
    }
}

impl RefereeConfig {
    /// The lobby name rendered from the template and the current range.
    pub fn lobby_name(&self) -> String {
        self.lobby
            .name_template
            .replace("{min}", &format_stars(self.difficulty.min()))
            .replace("{max}", &format_stars(self.difficulty.max()))
    }
}

/// Star ratings without trailing zeros: `4`, `5.5`, `6.25`.
pub fn format_stars(stars: f64) -> String {
    let text = format!("{stars:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// LobbyPhase
// ---------------------------------------------------------------------------

/// Where the controller is in the lobby lifecycle.
///
/// ```text
/// AwaitingAuth → AwaitingJoin → Idle ⇄ MatchInProgress
///       │              │          │            │
///       └──────────────┴──────────┴────────────┴──→ Closed
/// ```
///
/// - **AwaitingAuth**: connected, login not yet confirmed.
/// - **AwaitingJoin**: logged in; a `JOIN` or `!mp make` is in flight.
/// - **Idle**: in the lobby between matches.
/// - **MatchInProgress**: a match is being played.
/// - **Closed**: terminal. The lobby was closed, we left it, or login
///   failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyPhase {
    AwaitingAuth,
    AwaitingJoin,
    Idle,
    MatchInProgress,
    Closed,
}

impl LobbyPhase {
    /// Returns `true` while we are inside a lobby channel.
    pub fn in_lobby(&self) -> bool {
        matches!(self, Self::Idle | Self::MatchInProgress)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for LobbyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingAuth => write!(f, "AwaitingAuth"),
            Self::AwaitingJoin => write!(f, "AwaitingJoin"),
            Self::Idle => write!(f, "Idle"),
            Self::MatchInProgress => write!(f, "MatchInProgress"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
