//! REST client for the game's metadata API (v2).
//!
//! Endpoints used:
//!
//! | Call | Endpoint |
//! |---|---|
//! | token | `POST /oauth/token` (client credentials, form body) |
//! | beatmap | `GET /api/v2/beatmaps/{id}` |
//! | user | `GET /api/v2/users/@{name}` |
//!
//! Every API call carries a bearer token from the [`TokenCache`]. A `401`
//! drops the cached token so the next call fetches a fresh one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::models::{BeatmapResponse, ErrorResponse, TokenResponse};
use crate::{ApiError, BeatmapInfo, MetadataSource, Token, TokenCache, UserProfile};

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Connection settings for the metadata API (`[api]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash.
    pub address: String,
    pub client_id: String,
    pub client_secret: String,
    /// Upper bound for a single lookup, in seconds.
    pub timeout_secs: u64,
    /// Where the OAuth token is persisted between runs.
    pub token_cache: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "https://osu.ppy.sh".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 3,
            token_cache: PathBuf::from("cache/token.json"),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Metadata API client. Cheap to clone; clones share the HTTP connection
/// pool and the token cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
    tokens: Arc<TokenCache>,
}

impl ApiClient {
    /// Creates a client. Nothing is sent until the first lookup.
    pub fn new(config: ApiConfig, tokens: TokenCache) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lobbyref/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        })
    }

    /// `GET /api/v2/beatmaps/{id}`
    pub async fn beatmap(&self, id: u64) -> Result<BeatmapInfo, ApiError> {
        let rsp: BeatmapResponse = self.get(&format!("/api/v2/beatmaps/{id}")).await?;
        Ok(rsp.into())
    }

    /// `GET /api/v2/users/@{name}`
    pub async fn user(&self, name: &str) -> Result<UserProfile, ApiError> {
        self.get(&format!("/api/v2/users/@{name}")).await
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let token = self.token().await?;
        let url = format!("{}{endpoint}", self.base());

        let rsp = self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = rsp.status();
        tracing::debug!(target: "api", method = "GET", %endpoint, status = status.as_u16(), "api request");

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = rsp.bytes().await?;
        decode_body(&body)
    }

    async fn token(&self) -> Result<Token, ApiError> {
        self.tokens.get_or_refresh(|| self.request_token()).await
    }

    /// `POST /oauth/token` with the client-credentials grant.
    async fn request_token(&self) -> Result<Token, ApiError> {
        if !self.config.has_credentials() {
            return Err(ApiError::MissingCredentials);
        }

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", "public"),
        ];
        let rsp = self
            .http
            .post(format!("{}/oauth/token", self.base()))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        let status = rsp.status();
        tracing::debug!(target: "api", method = "POST", endpoint = "/oauth/token", status = status.as_u16(), "api request");

        if status != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: "/oauth/token".to_string(),
                status: status.as_u16(),
            });
        }

        let body = rsp.bytes().await?;
        let rsp: TokenResponse = decode_body(&body)?;
        Ok(Token::new(rsp.access_token, rsp.expires_in))
    }

    fn base(&self) -> &str {
        self.config.address.trim_end_matches('/')
    }
}

/// Decodes a `200 OK` body, surfacing an embedded `{error, ...}` object as
/// [`ApiError::Remote`].
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if let Ok(err) = serde_json::from_slice::<ErrorResponse>(body) {
        if !err.error.is_empty() {
            return Err(ApiError::Remote {
                error: err.error,
                description: err.error_description,
            });
        }
    }
    Ok(serde_json::from_slice(body)?)
}

impl MetadataSource for ApiClient {
    async fn fetch_beatmap(&self, id: u64, timeout: Duration) -> Result<BeatmapInfo, ApiError> {
        tokio::time::timeout(timeout, self.beatmap(id))
            .await
            .map_err(|_| ApiError::Timeout(timeout))?
    }

    async fn fetch_user(&self, name: &str, timeout: Duration) -> Result<UserProfile, ApiError> {
        tokio::time::timeout(timeout, self.user(name))
            .await
            .map_err(|_| ApiError::Timeout(timeout))?
    }
}
