//! Integration tests for the lobby controller with a canned metadata source.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lobbyref_api::{ApiError, BeatmapInfo, MetadataSource, UserProfile};
use lobbyref_protocol::{BeatmapRef, Event};
use lobbyref_referee::{Lobby, LobbyPhase, RefereeConfig};
use lobbyref_transport::{Outbox, OutboxReceiver};

// =========================================================================
// Mock metadata source
// =========================================================================

/// Beatmaps by id: `(stars, delay before answering)`. Unknown ids fail.
#[derive(Default)]
struct CannedSource {
    beatmaps: HashMap<u64, (f64, Duration)>,
    user_lookups: Arc<AtomicUsize>,
}

impl CannedSource {
    fn with(mut self, id: u64, stars: f64) -> Self {
        self.beatmaps.insert(id, (stars, Duration::ZERO));
        self
    }

    fn slow(mut self, id: u64, stars: f64, delay: Duration) -> Self {
        self.beatmaps.insert(id, (stars, delay));
        self
    }
}

impl MetadataSource for CannedSource {
    async fn fetch_beatmap(&self, id: u64, timeout: Duration) -> Result<BeatmapInfo, ApiError> {
        let Some(&(stars, delay)) = self.beatmaps.get(&id) else {
            return Err(ApiError::Status {
                endpoint: format!("/api/v2/beatmaps/{id}"),
                status: 404,
            });
        };
        tokio::time::timeout(timeout, tokio::time::sleep(delay))
            .await
            .map_err(|_| ApiError::Timeout(timeout))?;
        Ok(BeatmapInfo {
            id,
            set_id: id + 1000,
            stars,
            length_secs: 90,
            title: "Song".into(),
            artist: "Band".into(),
            version: "Hard".into(),
        })
    }

    async fn fetch_user(&self, name: &str, _timeout: Duration) -> Result<UserProfile, ApiError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(UserProfile {
            id: 1,
            username: name.to_string(),
            is_online: true,
            country_code: "NZ".into(),
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

const CH: &str = "#mp_5";

fn config() -> RefereeConfig {
    let mut config = RefereeConfig::default();
    config.lobby.operator = "Op".into();
    config
}

fn new_lobby(source: CannedSource, remembered: Option<&str>) -> (Lobby<CannedSource>, OutboxReceiver) {
    let (outbox, rx) = Outbox::detached();
    let lobby = Lobby::new(config(), remembered.map(String::from), source, outbox);
    (lobby, rx)
}

/// Logs in, joins `CH` as a rejoin (no setup lines) and seats `players`.
async fn seated(source: CannedSource, players: &[&str]) -> (Lobby<CannedSource>, OutboxReceiver) {
    let (lobby, mut rx) = new_lobby(source, Some(CH));
    lobby.handle(Event::Authenticated).await;
    lobby
        .handle(Event::Joined {
            channel: CH.into(),
            players: vec![],
        })
        .await;
    for (i, name) in players.iter().enumerate() {
        lobby
            .handle(Event::UserJoined {
                channel: CH.into(),
                name: name.to_string(),
                slot: i as u8 + 1,
            })
            .await;
    }
    if let Some(first) = players.first() {
        lobby.handle(host_changed(first)).await;
    }
    lobby.wait_pending().await;
    rx.drain_lines();
    (lobby, rx)
}

fn host_changed(name: &str) -> Event {
    Event::HostChanged {
        channel: CH.into(),
        name: name.into(),
    }
}

fn beatmap_changed(id: u64) -> Event {
    Event::BeatmapChanged {
        channel: CH.into(),
        beatmap: BeatmapRef {
            id,
            artist: "Band".into(),
            title: "Song".into(),
            version: "Hard".into(),
        },
    }
}

fn command(sender: &str, name: &str, args: &[&str]) -> Event {
    Event::UserCommand {
        channel: CH.into(),
        sender: sender.into(),
        name: name.into(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_new_lobby_is_created_set_up_and_remembered() {
    let (lobby, mut rx) = new_lobby(CannedSource::default(), None);
    let mut remembered = lobby.remembered();

    lobby.handle(Event::Authenticated).await;
    assert_eq!(
        rx.drain_lines(),
        vec!["PRIVMSG BanchoBot :!mp make 4-6* | Auto Host Rotate"]
    );

    let phase = lobby
        .handle(Event::Joined {
            channel: CH.into(),
            players: vec![],
        })
        .await;
    assert_eq!(phase, LobbyPhase::Idle);
    assert_eq!(
        rx.drain_lines(),
        vec![
            "PRIVMSG #mp_5 :!mp password",
            "PRIVMSG #mp_5 :!mp size 8",
            "PRIVMSG #mp_5 :!mp invite Op",
        ]
    );
    assert!(remembered.has_changed().unwrap());
    assert_eq!(remembered.borrow_and_update().as_deref(), Some(CH));
}

#[tokio::test]
async fn test_closed_lobby_is_forgotten() {
    let (lobby, _rx) = seated(CannedSource::default(), &["A"]).await;
    let remembered = lobby.remembered();
    assert_eq!(remembered.borrow().as_deref(), Some(CH));

    let phase = lobby.handle(Event::Closed { channel: CH.into() }).await;
    assert_eq!(phase, LobbyPhase::Closed);
    assert_eq!(*remembered.borrow(), None);
}

#[tokio::test]
async fn test_auth_error_reports_failure() {
    let (lobby, _rx) = new_lobby(CannedSource::default(), None);
    lobby
        .handle(Event::AuthError("Bad authentication token.".into()))
        .await;
    assert_eq!(lobby.phase().await, LobbyPhase::Closed);
    assert!(lobby.failure().await.is_some());
}

#[tokio::test]
async fn test_request_close_and_notify() {
    let (lobby, mut rx) = seated(CannedSource::default(), &["A"]).await;
    lobby.notify("Referee is restarting.");
    assert!(lobby.request_close().await);
    assert_eq!(
        rx.drain_lines(),
        vec![
            "PRIVMSG #mp_5 :Referee is restarting.",
            "PRIVMSG #mp_5 :!mp close",
        ]
    );

    let (idle, mut rx) = new_lobby(CannedSource::default(), None);
    idle.notify("nobody hears this");
    assert!(!idle.request_close().await);
    assert!(rx.drain_lines().is_empty());
}

#[tokio::test]
async fn test_user_join_looks_up_profile() {
    let source = CannedSource::default();
    let lookups = source.user_lookups.clone();
    let (_lobby, _rx) = seated(source, &["A", "B"]).await;
    assert_eq!(lookups.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Host rotation
// =========================================================================

#[tokio::test]
async fn test_match_finished_rotates_host() {
    let (lobby, mut rx) = seated(CannedSource::default(), &["A", "B", "C"]).await;
    lobby.handle(Event::MatchStarted { channel: CH.into() }).await;
    lobby.handle(Event::MatchFinished { channel: CH.into() }).await;

    assert_eq!(
        rx.drain_lines(),
        vec!["PRIVMSG #mp_5 :!mp host B", "PRIVMSG #mp_5 :Queue: C, A, B"]
    );
    let snapshot = lobby.snapshot().await;
    assert_eq!(snapshot.host.as_deref(), Some("B"));
    assert_eq!(snapshot.queue, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_players_leaving_keep_order() {
    let (lobby, mut rx) = seated(CannedSource::default(), &["A", "B", "C"]).await;

    lobby
        .handle(Event::UserLeft {
            channel: CH.into(),
            name: "B".into(),
        })
        .await;
    assert!(rx.drain_lines().is_empty());
    assert_eq!(lobby.snapshot().await.queue, vec!["C", "A"]);

    lobby
        .handle(Event::UserLeft {
            channel: CH.into(),
            name: "A".into(),
        })
        .await;
    assert_eq!(rx.drain_lines(), vec!["PRIVMSG #mp_5 :!mp host C"]);
    let snapshot = lobby.snapshot().await;
    assert_eq!(snapshot.queue, vec!["C"]);
    assert!(snapshot.queue_defined);
}

#[tokio::test]
async fn test_rejoin_with_unknown_order_until_operator_sets_it() {
    let (lobby, mut rx) = new_lobby(CannedSource::default(), Some(CH));
    lobby.handle(Event::Authenticated).await;
    lobby
        .handle(Event::Joined {
            channel: CH.into(),
            players: vec!["A".into(), "B".into(), "C".into()],
        })
        .await;
    let snapshot = lobby.snapshot().await;
    assert!(!snapshot.queue_defined);
    assert!(!snapshot.host_rotation);
    rx.drain_lines();

    // A host change is not policed while the order is unknown.
    lobby.handle(host_changed("C")).await;
    assert!(rx.drain_lines().is_empty());

    lobby.handle(command("Op", "q", &["c", "a", "b"])).await;
    lobby.handle(command("Op", "hr", &["on"])).await;
    assert_eq!(
        rx.drain_lines(),
        vec![
            "PRIVMSG #mp_5 :!mp host C",
            "PRIVMSG #mp_5 :Queue: A, B, C",
            "PRIVMSG #mp_5 :Host rotation is now on.",
        ]
    );
    assert!(lobby.snapshot().await.host_rotation);
}

#[tokio::test]
async fn test_skip_vote_threshold() {
    // Five players at 0.75 need four votes.
    let (lobby, mut rx) = seated(CannedSource::default(), &["A", "B", "C", "D", "E"]).await;
    for voter in ["B", "C", "D"] {
        lobby.handle(command(voter, "skip", &[])).await;
    }
    assert_eq!(lobby.snapshot().await.host.as_deref(), Some("A"));
    assert_eq!(rx.drain_lines().last().unwrap(), "PRIVMSG #mp_5 :Skip votes: 3/4");

    lobby.handle(command("E", "s", &[])).await;
    assert_eq!(lobby.snapshot().await.host.as_deref(), Some("B"));
}

// =========================================================================
// Beatmap lookups
// =========================================================================

#[tokio::test]
async fn test_out_of_range_beatmap_reverts_to_previous() {
    let source = CannedSource::default().with(100, 5.0).with(200, 7.5);
    let (lobby, mut rx) = seated(source, &["A"]).await;

    lobby.handle(beatmap_changed(100)).await;
    lobby.wait_pending().await;
    assert_eq!(lobby.snapshot().await.current_beatmap.unwrap().id, 100);
    assert!(rx.drain_lines().is_empty());

    lobby.handle(beatmap_changed(200)).await;
    lobby.wait_pending().await;
    let lines = rx.drain_lines();
    assert_eq!(lines[0], "PRIVMSG #mp_5 :!mp map 100 0");
    assert!(lines[1].contains("outside the allowed 4-6*"));
    assert_eq!(lobby.snapshot().await.current_beatmap.unwrap().id, 100);
}

#[tokio::test]
async fn test_failed_lookup_keeps_state() {
    let source = CannedSource::default().with(100, 5.0);
    let (lobby, mut rx) = seated(source, &["A"]).await;
    lobby.handle(beatmap_changed(100)).await;
    lobby.wait_pending().await;

    lobby.handle(beatmap_changed(404)).await;
    lobby.wait_pending().await;
    assert_eq!(lobby.snapshot().await.current_beatmap.unwrap().id, 100);
    assert!(rx.drain_lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_lookup_times_out() {
    let source = CannedSource::default().slow(100, 5.0, Duration::from_secs(10));
    let (lobby, _rx) = seated(source, &["A"]).await;

    lobby.handle(beatmap_changed(100)).await;
    lobby.wait_pending().await;
    assert!(lobby.snapshot().await.current_beatmap.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_late_result_for_old_pick_is_dropped() {
    let source = CannedSource::default()
        .slow(1, 5.0, Duration::from_secs(2))
        .with(2, 5.5);
    let (lobby, _rx) = seated(source, &["A"]).await;

    lobby.handle(beatmap_changed(1)).await;
    lobby.handle(beatmap_changed(2)).await;
    lobby.wait_pending().await;
    assert_eq!(lobby.snapshot().await.current_beatmap.unwrap().id, 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_abandons_pending_lookups() {
    let source = CannedSource::default().slow(1, 5.0, Duration::from_secs(2));
    let (lobby, mut rx) = seated(source, &["A"]).await;

    lobby.handle(beatmap_changed(1)).await;
    lobby.close();
    lobby.wait_pending().await;
    assert!(lobby.is_closed());
    assert!(lobby.snapshot().await.current_beatmap.is_none());
    assert!(rx.drain_lines().is_empty());

    // Nothing new is started after close.
    lobby.handle(beatmap_changed(1)).await;
    lobby.wait_pending().await;
    assert!(lobby.snapshot().await.current_beatmap.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_time_left_during_match() {
    let source = CannedSource::default().with(7, 5.0);
    let (lobby, mut rx) = seated(source, &["A"]).await;
    lobby.handle(beatmap_changed(7)).await;
    lobby.wait_pending().await;

    lobby.handle(Event::MatchStarted { channel: CH.into() }).await;
    tokio::time::advance(Duration::from_secs(25)).await;
    lobby.handle(command("A", "tl", &[])).await;
    assert_eq!(rx.drain_lines(), vec!["PRIVMSG #mp_5 :Time left: 1m 5s"]);
}
