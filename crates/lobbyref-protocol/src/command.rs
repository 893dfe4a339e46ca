//! Shell-style tokenizer for chat commands.
//!
//! Players type commands like `!q alice "bob the builder" 'carol'`. The
//! text is split the way a POSIX shell splits words, using [`shlex`]:
//!
//! - Unquoted whitespace separates words.
//! - `'...'` is taken literally, backslashes included.
//! - `"..."` allows `\"` and `\\` as escapes; any other backslash is kept.
//! - Outside quotes a backslash makes the next character literal.
//!
//! Quoted pieces glue onto adjacent unquoted text (`a"b c"d` is one word,
//! `ab cd`), and an empty pair of quotes produces an empty word.

use crate::ProtocolError;

/// Splits command text into words.
///
/// # Errors
///
/// [`ProtocolError::MalformedCommand`] if a quote is never closed or the
/// text ends with an unquoted backslash.
///
/// # Example
///
/// ```rust
/// use lobbyref_protocol::split_args;
///
/// let words = split_args(r#"!q alice "bob b" c\ d"#).unwrap();
/// assert_eq!(words, vec!["!q", "alice", "bob b", "c d"]);
/// ```
pub fn split_args(text: &str) -> Result<Vec<String>, ProtocolError> {
    shlex::split(text).ok_or(ProtocolError::MalformedCommand)
}
