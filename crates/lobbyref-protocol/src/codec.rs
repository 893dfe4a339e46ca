//! Line codec: frames the socket byte stream into [`Message`]s.
//!
//! The server terminates lines with `\n` (often `\r\n`). The decoder splits
//! on `\n`, strips an optional `\r`, and parses each line. Lines that do
//! not parse (blank lines, a prefix with no command) are logged at `trace`
//! and skipped; the stream never yields an error for them.
//!
//! Used with `tokio_util::codec::FramedRead`:
//!
//! ```rust,ignore
//! let mut lines = FramedRead::new(read_half, IrcLineCodec::new());
//! while let Some(msg) = lines.next().await {
//!     let msg = msg?;
//!     // ...
//! }
//! ```

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Message, Outbound, ProtocolError};

/// Newline-delimited protocol codec.
#[derive(Debug, Default, Clone)]
pub struct IrcLineCodec {
    /// How far into the buffer we already searched for `\n`, so a long
    /// line arriving in many reads is not rescanned from the start.
    scanned: usize,
}

impl IrcLineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one raw line; `None` means "skip it".
    fn parse_line(raw: &[u8]) -> Option<Message> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        tracing::trace!(target: "irc", line = %line, "<<");
        match Message::parse(&line) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::trace!(target: "irc", error = %e, "skipping line");
                None
            }
        }
    }
}

impl Decoder for IrcLineCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        loop {
            let Some(offset) = src[self.scanned..].iter().position(|&b| b == b'\n') else {
                self.scanned = src.len();
                return Ok(None);
            };
            let newline = self.scanned + offset;
            self.scanned = 0;

            let line = src.split_to(newline + 1);
            if let Some(msg) = Self::parse_line(&line[..newline]) {
                return Ok(Some(msg));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        if let Some(msg) = self.decode(src)? {
            return Ok(Some(msg));
        }
        // A final line without a terminator still counts.
        self.scanned = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let line = src.split();
        Ok(Self::parse_line(&line))
    }
}

impl Encoder<Outbound> for IrcLineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let wire = item.to_wire();
        dst.reserve(wire.len() + 1);
        dst.put_slice(wire.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
