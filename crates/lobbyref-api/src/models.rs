//! Metadata returned by the API, in the shape the referee uses.
//!
//! The REST responses nest and name things differently (`beatmapset.title`,
//! `difficulty_rating`, `total_length`); the private `*Response` structs
//! mirror the wire format and are converted into the flat public types.

use serde::{Deserialize, Serialize};

/// What the referee needs to know about a beatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatmapInfo {
    pub id: u64,
    pub set_id: u64,
    /// Star rating.
    pub stars: f64,
    /// Drain length in seconds.
    pub length_secs: u32,
    pub title: String,
    pub artist: String,
    /// Difficulty name.
    pub version: String,
}

impl BeatmapInfo {
    /// Link to the beatmap page.
    pub fn url(&self) -> String {
        format!("https://osu.ppy.sh/b/{}", self.id)
    }
}

/// A player's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub country_code: String,
}

// ---------------------------------------------------------------------------
// Wire formats
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct BeatmapResponse {
    id: u64,
    beatmapset_id: u64,
    difficulty_rating: f64,
    total_length: u32,
    version: String,
    #[serde(default)]
    beatmapset: Option<BeatmapsetResponse>,
}

#[derive(Debug, Deserialize)]
struct BeatmapsetResponse {
    artist: String,
    title: String,
}

impl From<BeatmapResponse> for BeatmapInfo {
    fn from(rsp: BeatmapResponse) -> Self {
        let (artist, title) = rsp
            .beatmapset
            .map(|set| (set.artist, set.title))
            .unwrap_or_default();
        Self {
            id: rsp.id,
            set_id: rsp.beatmapset_id,
            stars: rsp.difficulty_rating,
            length_secs: rsp.total_length,
            title,
            artist,
            version: rsp.version,
        }
    }
}

/// `{ "error": ..., "error_description": ... }`, sent with `200 OK` by the
/// token endpoint and occasionally by others.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Body of a successful `POST /oauth/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beatmap_response_flattens_set_fields() {
        let json = r#"{
            "id": 129891,
            "beatmapset_id": 39804,
            "difficulty_rating": 7.01,
            "total_length": 258,
            "version": "FOUR DIMENSIONS",
            "mode": "osu",
            "beatmapset": { "artist": "xi", "title": "FREEDOM DiVE", "creator": "Nakagawa-Kanon" }
        }"#;
        let info: BeatmapInfo = serde_json::from_str::<BeatmapResponse>(json).unwrap().into();
        assert_eq!(info.id, 129891);
        assert_eq!(info.set_id, 39804);
        assert_eq!(info.stars, 7.01);
        assert_eq!(info.length_secs, 258);
        assert_eq!(info.artist, "xi");
        assert_eq!(info.title, "FREEDOM DiVE");
        assert_eq!(info.version, "FOUR DIMENSIONS");
        assert_eq!(info.url(), "https://osu.ppy.sh/b/129891");
    }

    #[test]
    fn test_beatmap_without_set_has_empty_names() {
        let json = r#"{"id":1,"beatmapset_id":2,"difficulty_rating":3.5,"total_length":90,"version":"Hard"}"#;
        let info: BeatmapInfo = serde_json::from_str::<BeatmapResponse>(json).unwrap().into();
        assert_eq!(info.artist, "");
        assert_eq!(info.title, "");
    }

    #[test]
    fn test_user_profile_defaults_optional_fields() {
        let user: UserProfile = serde_json::from_str(r#"{"id":2,"username":"peppy"}"#).unwrap();
        assert!(!user.is_online);
        assert_eq!(user.country_code, "");
    }
}
