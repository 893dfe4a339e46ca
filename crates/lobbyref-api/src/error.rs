//! Error types for the metadata API client.

use std::time::Duration;

/// Errors that can occur while talking to the metadata API.
///
/// Callers in the referee treat every variant the same way (log and keep
/// the previous state), but the variants keep the logs useful.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The call did not finish within the caller's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP request itself failed (DNS, TLS, connection reset, ...).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than `200 OK`.
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    /// The server answered `200 OK` with an `{error, error_description}`
    /// body.
    #[error("api error {error}: {description}")]
    Remote { error: String, description: String },

    /// The response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No client id / secret configured.
    #[error("api credentials are not configured")]
    MissingCredentials,
}
