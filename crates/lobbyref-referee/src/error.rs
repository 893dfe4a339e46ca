//! Error types for the referee layer.

/// A player name query that could not be resolved.
///
/// These never end the session. They are reported back to the lobby and
/// the remaining work continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefereeError {
    /// No remaining player's name starts with the query.
    #[error("no player matches \"{0}\"")]
    NoMatch(String),

    /// More than one remaining player's name starts with the query.
    #[error("\"{query}\" is ambiguous ({})", .candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
}
