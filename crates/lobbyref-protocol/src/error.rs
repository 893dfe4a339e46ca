//! Error types for the protocol layer.
//!
//! Each crate in lobbyref defines its own error enum. A `ProtocolError`
//! always means "this line or this command text could not be understood";
//! it never means the connection itself is broken.

/// Errors that can occur while parsing protocol lines or chat commands.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The line was empty or contained only whitespace.
    #[error("empty line")]
    EmptyLine,

    /// The line had a source prefix but nothing after it.
    #[error("line has no command")]
    MissingCommand,

    /// A quote in a chat command was never closed, or the text ended with
    /// a lone backslash.
    #[error("unbalanced quote or trailing escape in command text")]
    MalformedCommand,

    /// Reading from the underlying stream failed.
    ///
    /// Only produced by the line codec; `tokio-util` requires decoder
    /// errors to be constructible from `std::io::Error`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
