//! Raw protocol messages.
//!
//! Every line the chat server sends has the shape
//!
//! ```text
//! [":" source " "] command {" " middle} [" :" trailing]
//! ```
//!
//! For example:
//!
//! ```text
//! :BanchoBot!cho@ppy.sh PRIVMSG #mp_1234 :alice joined in slot 2.
//!  └─ source ────────┘ └─ cmd ┘ └ mid ┘  └─ trailing ───────────┘
//! ```
//!
//! [`Message::parse`] turns such a line into a [`Message`]. It makes a
//! single pass over the input and places no cap on the line length, so a
//! very long chat message is accepted as-is.

use std::fmt;

use crate::ProtocolError;

/// One parsed protocol line.
///
/// Messages are immutable values; the reader loop produces one per line
/// and hands it to the [`Classifier`](crate::Classifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who sent the line. Any `!user@host` suffix has been stripped, so
    /// this is just the nickname (or the server name for numerics).
    pub source: Option<String>,

    /// The verb (`PRIVMSG`, `PING`, ...) or a three-digit numeric reply.
    pub command: String,

    /// Parameters in order. The last one may contain spaces if it was sent
    /// as a trailing (`:`-prefixed) parameter.
    pub params: Vec<String>,
}

impl Message {
    /// Parses one line (with or without its `\r\n` terminator).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyLine`] for blank or whitespace-only lines.
    /// - [`ProtocolError::MissingCommand`] when a source prefix is not
    ///   followed by a command.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(ProtocolError::EmptyLine);
        }

        let mut rest = line.trim_start();

        // Source prefix: `:nick!user@host` → `nick`.
        let mut source = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, tail) = next_field(stripped);
            let nick = prefix.split_once('!').map_or(prefix, |(nick, _)| nick);
            if !nick.is_empty() {
                source = Some(nick.to_string());
            }
            rest = tail;
        }

        let (command, mut rest) = next_field(rest);
        if command.is_empty() {
            return Err(ProtocolError::MissingCommand);
        }

        let mut params = Vec::new();
        loop {
            let remaining = rest.trim_start();
            if remaining.is_empty() {
                break;
            }
            // Everything after a leading `:` is one parameter, spaces and all.
            if let Some(trailing) = remaining.strip_prefix(':') {
                params.push(trailing.trim_end().to_string());
                break;
            }
            let (param, tail) = next_field(remaining);
            params.push(param.to_string());
            rest = tail;
        }

        Ok(Self {
            source,
            command: command.to_string(),
            params,
        })
    }

    /// Serializes the message back to wire form, without a terminator.
    ///
    /// The last parameter is always written as a trailing (`:`-prefixed)
    /// parameter, which is valid for every command and means a parameter
    /// containing spaces survives the round trip.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(source) = &self.source {
            out.push(':');
            out.push_str(source);
            out.push(' ');
        }
        out.push_str(&self.command);
        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                out.push(' ');
                out.push_str(param);
            }
            out.push_str(" :");
            out.push_str(last);
        }
        out
    }

    /// Returns the parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Splits off the next whitespace-delimited field.
///
/// Leading whitespace is skipped; the returned tail starts at the
/// whitespace that ended the field (or is empty).
fn next_field(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    }
}
