//! Process-wide logging setup.
//!
//! Targets used across the workspace:
//!
//! | Target | Level | What |
//! |---|---|---|
//! | `irc` | trace/debug | raw lines in and out |
//! | `chat` | info | lobby chat and commands |
//! | `api` | debug | metadata API requests |

use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if set, else `info` (`warn` when quiet).
pub fn filter(quiet: bool, env: Option<&str>) -> EnvFilter {
    match env.filter(|s| !s.trim().is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None if quiet => EnvFilter::new("warn"),
        None => EnvFilter::new("info"),
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init(quiet: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter(quiet, env.as_deref()))
        .with_target(true)
        .try_init();
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}
