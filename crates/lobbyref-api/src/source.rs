//! The metadata capability the referee depends on.
//!
//! The lobby controller never talks HTTP. It asks a [`MetadataSource`] for
//! beatmap and user information and gets an answer (or an error) within a
//! timeout. Production uses [`ApiClient`](crate::ApiClient); tests plug in
//! a canned implementation.

use std::future::Future;
use std::time::Duration;

use crate::{ApiError, BeatmapInfo, UserProfile};

/// Looks up beatmap and user metadata.
///
/// # Trait bounds
///
/// - `Send + Sync` so one source can be shared by every fetch task.
/// - `'static` because fetch tasks are spawned and may outlive the call
///   that started them.
///
/// Implementations must give up after `timeout` and return
/// [`ApiError::Timeout`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use lobbyref_api::{ApiError, BeatmapInfo, MetadataSource, UserProfile};
///
/// /// Knows nothing, quickly.
/// struct Offline;
///
/// impl MetadataSource for Offline {
///     async fn fetch_beatmap(&self, _id: u64, timeout: Duration) -> Result<BeatmapInfo, ApiError> {
///         Err(ApiError::Timeout(timeout))
///     }
///
///     async fn fetch_user(&self, _name: &str, timeout: Duration) -> Result<UserProfile, ApiError> {
///         Err(ApiError::Timeout(timeout))
///     }
/// }
/// ```
pub trait MetadataSource: Send + Sync + 'static {
    /// Fetches metadata for beatmap `id`.
    fn fetch_beatmap(
        &self,
        id: u64,
        timeout: Duration,
    ) -> impl Future<Output = Result<BeatmapInfo, ApiError>> + Send;

    /// Fetches the public profile of the player called `name`.
    fn fetch_user(
        &self,
        name: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;
}
