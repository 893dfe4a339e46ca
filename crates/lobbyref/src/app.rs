//! Startup, the main session and shutdown.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use lobbyref_api::{ApiClient, MetadataSource, TokenCache};
use lobbyref_referee::{InterruptAction, Lobby};
use lobbyref_transport::TcpConnection;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;

use crate::session::{Exit, Session};
use crate::shutdown;
use crate::{CacheFile, Cli, Config, LobbyrefError, crash, dashboard};

const CRASH_NOTICE: &str = "The referee ran into an internal error and is shutting down.";

/// Runs the bot until the lobby closes, the connection drops or the process
/// is interrupted.
pub async fn run(cli: Cli) -> Result<(), LobbyrefError> {
    let config = Config::load(&cli.config)?;
    config.require_login()?;
    crash::install(config.paths.crash_record.clone());

    let cache = CacheFile::load(&config.paths.cache);
    let remembered = cli.channel.clone().or_else(|| cache.lobby().map(String::from));
    if let Some(channel) = &remembered {
        tracing::info!(%channel, "will rejoin lobby");
    }

    if !config.api.has_credentials() {
        tracing::warn!("no API credentials, beatmap checks will fail");
    }
    let tokens = TokenCache::load(config.api.token_cache.clone());
    let client = ApiClient::new(config.api.clone(), tokens)?;

    let connection = TcpConnection::connect(&config.irc.address).await?;
    let (reader, writer) = connection.into_split();
    let mut session = Session::new(reader, writer, &config, client, cache, remembered);
    session.login(&config.irc.username, &config.irc.password)?;

    let (stop_page, page_stopped) = shutdown::channel();
    let status_page = if config.dashboard.enabled {
        let listener = TcpListener::bind(config.dashboard.address)
            .await
            .map_err(|source| LobbyrefError::Io {
                context: format!("cannot bind status page to {}", config.dashboard.address),
                source,
            })?;
        let lobby = session.lobby().clone();
        Some(tokio::spawn(async move {
            if let Err(e) = dashboard::serve(listener, lobby, page_stopped).await {
                tracing::error!(error = %e, "status page failed");
            }
        }))
    } else {
        None
    };

    let outcome = run_guarded(&mut session, interrupted()).await;

    match &outcome {
        Ok(Exit::Closed) => tracing::info!("lobby closed, exiting"),
        Ok(Exit::Interrupted) => on_interrupt(session.lobby(), config.lobby.on_interrupt).await,
        Err(e) => tracing::error!(error = %e, "session ended"),
    }

    stop_page.fire();
    if let Some(handle) = status_page {
        let _ = handle.await;
    }

    let flushed = session.finish().await;
    outcome?;
    flushed.map(drop)
}

/// Runs the session, turning a panic into [`LobbyrefError::Panicked`] after
/// a best-effort notice to the lobby.
pub(crate) async fn run_guarded<R, M, F>(
    session: &mut Session<R, M>,
    interrupt: F,
) -> Result<Exit, LobbyrefError>
where
    R: AsyncRead + Unpin,
    M: MetadataSource,
    F: Future,
{
    match AssertUnwindSafe(session.run(interrupt)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            session.lobby().notify(CRASH_NOTICE);
            Err(LobbyrefError::Panicked(crash::payload_message(payload.as_ref())))
        }
    }
}

/// Resolves on SIGINT/SIGTERM. Never resolves if signals cannot be watched.
async fn interrupted() {
    if let Err(e) = shutdown::wait_for_signal().await {
        tracing::error!(error = %e, "cannot listen for signals");
        std::future::pending::<()>().await;
    }
}

async fn on_interrupt<M: MetadataSource>(lobby: &Lobby<M>, action: InterruptAction) {
    let close = match action {
        InterruptAction::Close => true,
        InterruptAction::Keep => false,
        InterruptAction::Prompt => {
            if !lobby.phase().await.in_lobby() {
                return;
            }
            confirm("Close the lobby before exiting? [y/N] ").await
        }
    };
    if close {
        lobby.request_close().await;
    } else {
        tracing::info!("leaving the lobby open");
    }
}

/// Asks a yes/no question on the terminal. Anything but "y" is no.
async fn confirm(question: &'static str) -> bool {
    let answer = tokio::task::spawn_blocking(move || {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{question}");
        let _ = stdout.flush();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await;
    match answer {
        Ok(Ok(line)) => parse_yes(&line),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "cannot read answer");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "prompt task failed");
            false
        }
    }
}

fn parse_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
