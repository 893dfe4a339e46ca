//! Lobby events and the classifier that recognizes them.
//!
//! Most of what matters to a referee does not arrive as a dedicated
//! protocol command. The service bot announces joins, leaves, host changes
//! and match progress as ordinary chat lines in the lobby channel:
//!
//! ```text
//! :BanchoBot!cho@ppy.sh PRIVMSG #mp_42 :alice joined in slot 3.
//! :BanchoBot!cho@ppy.sh PRIVMSG #mp_42 :The match has started!
//! ```
//!
//! The [`Classifier`] turns a parsed [`Message`] into at most one [`Event`]
//! by matching those announcements against fixed wording. Classification
//! is pure: no I/O, no state, the same message always yields the same
//! event.

use crate::{split_args, Message};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Something that happened on the server that the lobby controller cares
/// about.
///
/// Each variant carries only the fields relevant to it. `channel` is the
/// lobby the event belongs to, so the controller can ignore traffic for
/// channels it is not refereeing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Login succeeded (numeric `001`).
    Authenticated,
    /// Login was rejected (numeric `464`).
    AuthError(String),
    /// A `JOIN` failed, usually because the lobby no longer exists (`403`).
    JoinError(String),
    /// We are in `channel`; `players` were already there (`353`).
    Joined { channel: String, players: Vec<String> },
    /// We left `channel` (`PART`).
    Left { channel: String },
    /// The service bot closed the lobby.
    Closed { channel: String },
    /// A player took a slot.
    UserJoined {
        channel: String,
        name: String,
        slot: u8,
    },
    /// A player left the lobby.
    UserLeft { channel: String, name: String },
    /// The host role moved to `name`.
    HostChanged { channel: String, name: String },
    /// The host picked a different beatmap.
    BeatmapChanged { channel: String, beatmap: BeatmapRef },
    /// Every player in the lobby pressed ready.
    AllReady { channel: String },
    MatchStarted { channel: String },
    MatchFinished { channel: String },
    MatchAborted { channel: String },
    /// Ordinary chat from a player.
    UserMessage {
        channel: String,
        sender: String,
        text: String,
    },
    /// A `!`-prefixed chat command. `name` is the word after `!` with its
    /// case preserved; `args` are the remaining shell-style words.
    UserCommand {
        channel: String,
        sender: String,
        name: String,
        args: Vec<String>,
    },
}

impl Event {
    /// The lobby channel this event belongs to, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Authenticated | Self::AuthError(_) | Self::JoinError(_) => None,
            Self::Joined { channel, .. }
            | Self::Left { channel }
            | Self::Closed { channel }
            | Self::UserJoined { channel, .. }
            | Self::UserLeft { channel, .. }
            | Self::HostChanged { channel, .. }
            | Self::BeatmapChanged { channel, .. }
            | Self::AllReady { channel }
            | Self::MatchStarted { channel }
            | Self::MatchFinished { channel }
            | Self::MatchAborted { channel }
            | Self::UserMessage { channel, .. }
            | Self::UserCommand { channel, .. } => Some(channel),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::AuthError(_) => "auth_error",
            Self::JoinError(_) => "join_error",
            Self::Joined { .. } => "joined",
            Self::Left { .. } => "left",
            Self::Closed { .. } => "closed",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::HostChanged { .. } => "host_changed",
            Self::BeatmapChanged { .. } => "beatmap_changed",
            Self::AllReady { .. } => "all_ready",
            Self::MatchStarted { .. } => "match_started",
            Self::MatchFinished { .. } => "match_finished",
            Self::MatchAborted { .. } => "match_aborted",
            Self::UserMessage { .. } => "user_message",
            Self::UserCommand { .. } => "user_command",
        }
    }
}

/// The beatmap named in a "Beatmap changed to" announcement.
///
/// Only the id is authoritative; the rest is display text. Full metadata
/// (star rating, length) comes from the metadata API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatmapRef {
    pub id: u64,
    pub artist: String,
    pub title: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Maps messages to events.
///
/// Only chat lines sent by `service_bot` are inspected for announcements;
/// a player typing "alice left the game." is just chat.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub service_bot: String,
    /// Our own nickname. Only a `PART` from us is [`Event::Left`]; players
    /// leaving the channel are announced by the service bot instead.
    pub nick: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("BanchoBot")
    }
}

impl Classifier {
    pub fn new(service_bot: impl Into<String>) -> Self {
        Self {
            service_bot: service_bot.into(),
            nick: String::new(),
        }
    }

    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = nick.into();
        self
    }

    /// Classifies one message. Returns `None` for anything the lobby
    /// controller does not need to see.
    pub fn classify(&self, msg: &Message) -> Option<Event> {
        match msg.command.as_str() {
            "001" => Some(Event::Authenticated),
            "464" => Some(Event::AuthError(param_or_command(msg, 1))),
            "403" => Some(Event::JoinError(param_or_command(msg, 2))),
            "353" => {
                let channel = msg.param(2)?.to_string();
                Some(Event::Joined {
                    channel,
                    players: names_reply_players(msg.param(3).unwrap_or("")),
                })
            }
            "PART" if self.is_own(msg) => Some(Event::Left {
                channel: msg.param(0)?.to_string(),
            }),
            "PRIVMSG" => self.classify_privmsg(msg),
            _ => None,
        }
    }

    fn is_own(&self, msg: &Message) -> bool {
        !self.nick.is_empty()
            && msg
                .source
                .as_deref()
                .is_some_and(|source| source.eq_ignore_ascii_case(&self.nick))
    }

    fn classify_privmsg(&self, msg: &Message) -> Option<Event> {
        let channel = msg.param(0)?.to_string();
        let sender = msg.source.as_deref().unwrap_or("");

        if sender.eq_ignore_ascii_case(&self.service_bot) {
            return classify_announcement(channel, msg.param(1)?);
        }

        let text = msg.params.get(1..)?.join(" ");
        if text.starts_with('!') {
            // Unparsable quoting: drop the command rather than guess.
            let mut words = match split_args(&text) {
                Ok(words) => words.into_iter(),
                Err(e) => {
                    tracing::debug!(%sender, error = %e, "ignoring malformed command");
                    return None;
                }
            };
            let first = words.next()?;
            return Some(Event::UserCommand {
                channel,
                sender: sender.to_string(),
                name: first.trim_start_matches('!').to_string(),
                args: words.collect(),
            });
        }

        Some(Event::UserMessage {
            channel,
            sender: sender.to_string(),
            text,
        })
    }
}

/// Matches service-bot wording. The first pattern that fits wins.
fn classify_announcement(channel: String, text: &str) -> Option<Event> {
    if let Some((name, slot)) = parse_user_joined(text) {
        return Some(Event::UserJoined {
            channel,
            name,
            slot,
        });
    }
    if let Some(name) = text.strip_suffix(" left the game.") {
        return Some(Event::UserLeft {
            channel,
            name: player_name(name)?,
        });
    }
    if let Some(name) = text.strip_suffix(" became the host.") {
        return Some(Event::HostChanged {
            channel,
            name: player_name(name)?,
        });
    }
    if text.starts_with("Beatmap changed to: ") {
        // A malformed or non-numeric id yields no event at all.
        let beatmap = parse_beatmap_changed(text)?;
        return Some(Event::BeatmapChanged { channel, beatmap });
    }
    match text {
        "All players are ready" => Some(Event::AllReady { channel }),
        "The match has started!" => Some(Event::MatchStarted { channel }),
        "The match has finished!" => Some(Event::MatchFinished { channel }),
        "Aborted the match" => Some(Event::MatchAborted { channel }),
        "Closed the match" => Some(Event::Closed { channel }),
        _ => None,
    }
}

/// `"<name> joined in slot <n>."`, optionally followed by a team suffix
/// (`"... slot 3 for team red."`).
fn parse_user_joined(text: &str) -> Option<(String, u8)> {
    let body = text.strip_suffix('.')?;
    let (name, rest) = body.split_once(" joined in slot ")?;
    let digits = rest.split(' ').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let slot = digits.parse().ok()?;
    Some((player_name(name)?, slot))
}

/// `"Beatmap changed to: <artist> - <title> [<version>] (<url>/b/<id>)"`.
///
/// Artist and title may themselves contain `" - "` or `" ["`; the split
/// points are the last occurrences, matching how the bot formats the line.
fn parse_beatmap_changed(text: &str) -> Option<BeatmapRef> {
    let rest = text.strip_prefix("Beatmap changed to: ")?;
    let rest = rest.strip_suffix(')')?;
    let (head, url) = rest.rsplit_once(" (")?;
    let (_, id) = url.rsplit_once("/b/")?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id = id.parse().ok()?;

    let (song, version) = head.strip_suffix(']')?.rsplit_once(" [")?;
    let (artist, title) = song.rsplit_once(" - ")?;
    if artist.is_empty() || title.is_empty() || version.is_empty() {
        return None;
    }

    Some(BeatmapRef {
        id,
        artist: artist.to_string(),
        title: title.to_string(),
        version: version.to_string(),
    })
}

/// Player names in announcements use display form (`"big bob"`), while
/// the protocol uses `big_bob`. Normalize to the protocol form.
fn player_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.replace(' ', "_"))
}

/// Player list from a `353` names reply.
///
/// The first and last tokens are not players (the service bot and a
/// terminator), so they are trimmed; fewer than two tokens means an empty
/// lobby. Mode sigils (`@`, `+`) are removed.
fn names_reply_players(list: &str) -> Vec<String> {
    let tokens: Vec<&str> = list.split_whitespace().collect();
    if tokens.len() < 2 {
        return Vec::new();
    }
    tokens[1..tokens.len() - 1]
        .iter()
        .map(|t| t.trim_start_matches(['@', '+']).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parameter `index`, or the command text when the server sent less than
/// expected.
fn param_or_command(msg: &Message, index: usize) -> String {
    msg.param(index).unwrap_or(&msg.command).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(line: &str) -> Option<Event> {
        let msg = Message::parse(line).unwrap();
        Classifier::default().with_nick("referee").classify(&msg)
    }

    fn bot(text: &str) -> Option<Event> {
        classify(&format!(":BanchoBot!cho@ppy.sh PRIVMSG #mp_5 :{text}"))
    }

    fn ch() -> String {
        "#mp_5".to_string()
    }

    // -- Numerics ---------------------------------------------------------

    #[test]
    fn test_welcome_is_authenticated() {
        assert_eq!(
            classify(":cho.ppy.sh 001 referee :Welcome to osu!Bancho."),
            Some(Event::Authenticated)
        );
    }

    #[test]
    fn test_auth_error_uses_second_param_or_command() {
        assert_eq!(
            classify(":cho.ppy.sh 464 referee :Bad authentication token."),
            Some(Event::AuthError("Bad authentication token.".into()))
        );
        assert_eq!(classify("464"), Some(Event::AuthError("464".into())));
    }

    #[test]
    fn test_join_error_uses_third_param_or_command() {
        assert_eq!(
            classify(":cho.ppy.sh 403 referee #mp_5 :No such channel #mp_5"),
            Some(Event::JoinError("No such channel #mp_5".into()))
        );
        assert_eq!(
            classify(":cho.ppy.sh 403 referee"),
            Some(Event::JoinError("403".into()))
        );
    }

    #[test]
    fn test_names_reply_trims_sentinels() {
        assert_eq!(
            classify(":cho.ppy.sh 353 referee = #mp_5 :@BanchoBot alice +bob carol "),
            Some(Event::Joined {
                channel: ch(),
                players: vec!["alice".into(), "bob".into()],
            })
        );
    }

    #[test]
    fn test_names_reply_with_too_few_tokens_is_empty() {
        assert_eq!(
            classify(":cho.ppy.sh 353 referee = #mp_5 :@BanchoBot"),
            Some(Event::Joined {
                channel: ch(),
                players: vec![],
            })
        );
        assert_eq!(
            classify(":cho.ppy.sh 353 referee = #mp_5"),
            Some(Event::Joined {
                channel: ch(),
                players: vec![],
            })
        );
    }

    #[test]
    fn test_own_part_is_left() {
        assert_eq!(
            classify(":referee!cho@ppy.sh PART :#mp_5"),
            Some(Event::Left { channel: ch() })
        );
        assert_eq!(
            classify(":Referee PART :#mp_5"),
            Some(Event::Left { channel: ch() })
        );
    }

    #[test]
    fn test_player_part_is_ignored() {
        assert_eq!(classify(":bob!cho@ppy.sh PART :#mp_5"), None);

        let msg = Message::parse(":referee!cho@ppy.sh PART :#mp_5").unwrap();
        assert_eq!(Classifier::default().classify(&msg), None);
    }

    #[test]
    fn test_unrelated_commands_yield_nothing() {
        assert_eq!(classify("PING :cho.ppy.sh"), None);
        assert_eq!(classify(":cho.ppy.sh 372 referee :motd"), None);
        assert_eq!(classify(":alice!cho@ppy.sh QUIT :ping timeout"), None);
    }

    // -- Service bot announcements ---------------------------------------

    #[test]
    fn test_user_joined_with_and_without_team() {
        assert_eq!(
            bot("alice joined in slot 3."),
            Some(Event::UserJoined {
                channel: ch(),
                name: "alice".into(),
                slot: 3,
            })
        );
        assert_eq!(
            bot("big bob joined in slot 12 for team red."),
            Some(Event::UserJoined {
                channel: ch(),
                name: "big_bob".into(),
                slot: 12,
            })
        );
        assert_eq!(bot("alice joined in slot x."), None);
    }

    #[test]
    fn test_user_left_and_host_changed() {
        assert_eq!(
            bot("alice left the game."),
            Some(Event::UserLeft {
                channel: ch(),
                name: "alice".into(),
            })
        );
        assert_eq!(
            bot("bob became the host."),
            Some(Event::HostChanged {
                channel: ch(),
                name: "bob".into(),
            })
        );
    }

    #[test]
    fn test_beatmap_changed() {
        assert_eq!(
            bot("Beatmap changed to: xi - FREEDOM DiVE [FOUR DIMENSIONS] (https://osu.ppy.sh/b/129891)"),
            Some(Event::BeatmapChanged {
                channel: ch(),
                beatmap: BeatmapRef {
                    id: 129891,
                    artist: "xi".into(),
                    title: "FREEDOM DiVE".into(),
                    version: "FOUR DIMENSIONS".into(),
                },
            })
        );
    }

    #[test]
    fn test_beatmap_changed_splits_on_last_separators() {
        let Some(Event::BeatmapChanged { beatmap, .. }) =
            bot("Beatmap changed to: A - B - C [Hard] [Insane] (https://osu.ppy.sh/b/7)")
        else {
            panic!("expected a beatmap change");
        };
        assert_eq!(beatmap.artist, "A - B");
        assert_eq!(beatmap.title, "C [Hard]");
        assert_eq!(beatmap.version, "Insane");
    }

    #[test]
    fn test_beatmap_changed_with_bad_id_yields_nothing() {
        assert_eq!(
            bot("Beatmap changed to: A - B [C] (https://osu.ppy.sh/b/abc)"),
            None
        );
        assert_eq!(bot("Beatmap changed to: A - B [C] (https://osu.ppy.sh/b/)"), None);
        assert_eq!(bot("Beatmap changed to: nonsense"), None);
    }

    #[test]
    fn test_lifecycle_announcements() {
        assert_eq!(bot("All players are ready"), Some(Event::AllReady { channel: ch() }));
        assert_eq!(bot("The match has started!"), Some(Event::MatchStarted { channel: ch() }));
        assert_eq!(bot("The match has finished!"), Some(Event::MatchFinished { channel: ch() }));
        assert_eq!(bot("Aborted the match"), Some(Event::MatchAborted { channel: ch() }));
        assert_eq!(bot("Closed the match"), Some(Event::Closed { channel: ch() }));
    }

    #[test]
    fn test_unknown_bot_text_yields_nothing() {
        assert_eq!(bot("Changed match host to alice"), None);
        assert_eq!(bot("All players are ready!"), None);
    }

    #[test]
    fn test_announcement_wording_from_players_is_chat() {
        assert_eq!(
            classify(":mallory!cho@ppy.sh PRIVMSG #mp_5 :alice left the game."),
            Some(Event::UserMessage {
                channel: ch(),
                sender: "mallory".into(),
                text: "alice left the game.".into(),
            })
        );
    }

    #[test]
    fn test_custom_service_bot_name() {
        let classifier = Classifier::new("RefBot");
        let msg = Message::parse(":refbot PRIVMSG #mp_5 :The match has started!").unwrap();
        assert_eq!(
            classifier.classify(&msg),
            Some(Event::MatchStarted { channel: ch() })
        );
    }

    // -- Player chat ------------------------------------------------------

    #[test]
    fn test_command_keeps_case_and_quoted_args() {
        assert_eq!(
            classify(r#":op!cho@ppy.sh PRIVMSG #mp_5 :!Q alice "big bob""#),
            Some(Event::UserCommand {
                channel: ch(),
                sender: "op".into(),
                name: "Q".into(),
                args: vec!["alice".into(), "big bob".into()],
            })
        );
    }

    #[test]
    fn test_command_with_unbalanced_quote_is_dropped() {
        assert_eq!(classify(r#":op PRIVMSG #mp_5 :!q "alice"#), None);
    }

    #[test]
    fn test_plain_chat_is_user_message() {
        assert_eq!(
            classify(":alice!cho@ppy.sh PRIVMSG #mp_5 :gl hf"),
            Some(Event::UserMessage {
                channel: ch(),
                sender: "alice".into(),
                text: "gl hf".into(),
            })
        );
    }

    #[test]
    fn test_privmsg_without_text_yields_nothing() {
        assert_eq!(classify(":alice PRIVMSG"), None);
    }

    #[test]
    fn test_event_channel_and_kind() {
        let event = bot("alice left the game.").unwrap();
        assert_eq!(event.channel(), Some("#mp_5"));
        assert_eq!(event.kind(), "user_left");
        assert_eq!(Event::Authenticated.channel(), None);
    }
}
