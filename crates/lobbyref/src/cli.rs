//! Command-line arguments.

use std::path::PathBuf;

use crate::LobbyrefError;
use crate::config::DEFAULT_PATH;

pub const USAGE: &str = "usage: lobbyref [-c config] [-q] [channel]";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config: PathBuf,
    /// Only log warnings and errors.
    pub quiet: bool,
    /// Join this lobby instead of the remembered one or a new one.
    pub channel: Option<String>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_PATH),
            quiet: false,
            channel: None,
        }
    }
}

impl Cli {
    /// Parses arguments, program name excluded.
    pub fn parse<I, S>(args: I) -> Result<Self, LobbyrefError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cli = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| LobbyrefError::Usage(format!("{arg} needs a path")))?;
                    cli.config = PathBuf::from(path);
                }
                "-q" | "--quiet" => cli.quiet = true,
                "-h" | "--help" => return Err(LobbyrefError::Usage(USAGE.to_string())),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(LobbyrefError::Usage(format!("unknown option {flag}")));
                }
                _ if cli.channel.is_some() => {
                    return Err(LobbyrefError::Usage(format!("unexpected argument {arg}")));
                }
                _ => cli.channel = Some(normalize_channel(&arg)),
            }
        }
        Ok(cli)
    }
}

/// `mp_123` and `123` both mean `#mp_123`.
fn normalize_channel(arg: &str) -> String {
    if arg.starts_with('#') {
        arg.to_string()
    } else if arg.bytes().all(|b| b.is_ascii_digit()) {
        format!("#mp_{arg}")
    } else {
        format!("#{arg}")
    }
}
