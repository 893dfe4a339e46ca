//! Outbound command vocabulary.
//!
//! Everything the referee ever says to the server is one of these values.
//! Building lines through a closed set of variants keeps formatting in one
//! place: callers never concatenate protocol text by hand.

use std::fmt;

/// A command sent to the chat server. Renders to exactly one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// `PASS <password>`: must precede `NICK` during login.
    Pass(String),
    /// `NICK <name>`
    Nick(String),
    /// `JOIN <channel>`
    Join(String),
    /// `PART <channel>`
    Part(String),
    /// `PONG :<token>`: answer to a server `PING`.
    Pong(String),
    /// `PRIVMSG <target> :<text>`
    Privmsg { target: String, text: String },
}

impl Outbound {
    /// A chat message to a channel or user.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Privmsg {
            target: target.into(),
            text: text.into(),
        }
    }

    /// A multiplayer-management command addressed to `target` (the lobby
    /// channel, or the service bot for [`MpCommand::Make`]).
    pub fn mp(target: impl Into<String>, command: MpCommand) -> Self {
        Self::privmsg(target, command.to_string())
    }

    /// Renders the command as a protocol line, without a terminator.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Pass(password) => format!("PASS {password}"),
            Self::Nick(name) => format!("NICK {name}"),
            Self::Join(channel) => format!("JOIN {channel}"),
            Self::Part(channel) => format!("PART {channel}"),
            Self::Pong(token) => format!("PONG :{token}"),
            // Chat text is a single line; embedded newlines would smuggle a
            // second command onto the wire.
            Self::Privmsg { target, text } => {
                format!("PRIVMSG {target} :{}", text.replace(['\r', '\n'], " "))
            }
        }
    }
}

/// Logs show what was sent, but never the password.
impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("PASS ********"),
            other => f.write_str(&other.to_wire()),
        }
    }
}

// ---------------------------------------------------------------------------
// !mp commands
// ---------------------------------------------------------------------------

/// The `!mp` family understood by the service bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpCommand {
    /// Create a new lobby with the given name.
    Make(String),
    /// Clear the lobby password.
    Password,
    /// Set the number of slots.
    Size(u8),
    /// Invite a user to the lobby.
    Invite(String),
    /// Give the host role to a player.
    Host(String),
    /// Start the match.
    Start,
    /// Abort the running match.
    Abort,
    /// Close the lobby.
    Close,
    /// Switch to a beatmap by id (game mode 0).
    Map(u64),
    /// Rename the lobby.
    Name(String),
}

impl fmt::Display for MpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Make(name) => write!(f, "!mp make {name}"),
            Self::Password => f.write_str("!mp password"),
            Self::Size(size) => write!(f, "!mp size {size}"),
            Self::Invite(user) => write!(f, "!mp invite {user}"),
            Self::Host(user) => write!(f, "!mp host {user}"),
            Self::Start => f.write_str("!mp start"),
            Self::Abort => f.write_str("!mp abort"),
            Self::Close => f.write_str("!mp close"),
            Self::Map(id) => write!(f, "!mp map {id} 0"),
            Self::Name(name) => write!(f, "!mp name {name}"),
        }
    }
}
