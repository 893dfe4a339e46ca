//! Metadata API access for lobbyref.
//!
//! The referee needs two facts it cannot learn from chat: a beatmap's star
//! rating and length, and (for logging) who a newly joined player is. This
//! crate provides them:
//!
//! 1. **Capability**: the [`MetadataSource`] trait, which is all the
//!    referee depends on.
//! 2. **Client**: [`ApiClient`], the REST implementation of that trait.
//! 3. **Tokens**: [`TokenCache`], the OAuth token kept in memory and on
//!    disk.
//!
//! # How it fits in the stack
//!
//! ```text
//! lobbyref-referee  ── MetadataSource ──→  ApiClient ──HTTPS──→ REST API v2
//!                                             │
//!                                        TokenCache (cache/token.json)
//! ```

mod client;
mod error;
mod models;
mod source;
mod token;

pub use client::{ApiClient, ApiConfig};
pub use error::ApiError;
pub use models::{BeatmapInfo, UserProfile};
pub use source::MetadataSource;
pub use token::{Token, TokenCache, EXPIRY_MARGIN_SECS};
