//! Read-only status page.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | HTML summary of the lobby |
//! | `GET /status` | [`LobbySnapshot`] as JSON |

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use lobbyref_api::MetadataSource;
use lobbyref_referee::{Lobby, LobbySnapshot, format_stars};
use tokio::net::TcpListener;

use crate::shutdown::Stopped;

pub fn router<M: MetadataSource>(lobby: Lobby<M>) -> Router {
    Router::new()
        .route("/", get(index::<M>))
        .route("/status", get(status::<M>))
        .with_state(lobby)
}

/// Serves the status page on `listener` until `shutdown` resolves.
pub async fn serve<M: MetadataSource>(
    listener: TcpListener,
    lobby: Lobby<M>,
    shutdown: Stopped,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "status page listening");
    }
    axum::serve(listener, router(lobby))
        .with_graceful_shutdown(shutdown.wait())
        .await
}

async fn status<M: MetadataSource>(State(lobby): State<Lobby<M>>) -> Json<LobbySnapshot> {
    Json(lobby.snapshot().await)
}

async fn index<M: MetadataSource>(State(lobby): State<Lobby<M>>) -> Html<String> {
    Html(render(&lobby.snapshot().await))
}

fn render(snapshot: &LobbySnapshot) -> String {
    let channel = snapshot.channel.as_deref().unwrap_or("(none)");
    let host = snapshot.host.as_deref().unwrap_or("(nobody)");
    let [min, max] = snapshot.difficulty_range;

    let beatmap = match &snapshot.current_beatmap {
        Some(b) => format!(
            r#"<a href="{}">{} - {} [{}]</a> ({}*)"#,
            b.url(),
            escape(&b.artist),
            escape(&b.title),
            escape(&b.version),
            format_stars(b.stars)
        ),
        None => "(none)".to_string(),
    };

    let mut queue = String::new();
    for name in &snapshot.queue {
        queue.push_str(&format!("<li>{}</li>", escape(name)));
    }
    if !snapshot.queue_defined {
        queue.push_str("<li><em>order unknown</em></li>");
    }

    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>lobbyref</title></head><body>\n\
         <h1>{channel}</h1>\n\
         <p>Phase: {phase:?}. Host: {host}. Match running: {running}.</p>\n\
         <p>Host rotation: {rotation}. Difficulty {min}-{max}* ({constraint}).</p>\n\
         <p>Beatmap: {beatmap}</p>\n\
         <h2>Queue</h2>\n<ol>{queue}</ol>\n\
         </body></html>\n",
        channel = escape(channel),
        phase = snapshot.phase,
        host = escape(host),
        running = yes_no(snapshot.match_in_progress),
        rotation = on_off(snapshot.host_rotation),
        min = format_stars(min),
        max = format_stars(max),
        constraint = on_off(snapshot.difficulty_constraint),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
