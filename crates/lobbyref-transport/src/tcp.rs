//! Plain TCP connection to the chat server.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::TransportError;

/// An open connection to the chat server.
///
/// The reader loop and the writer task run concurrently, so the stream is
/// split into owned halves with [`into_split`](Self::into_split) right after
/// connecting.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpConnection {
    /// Connects to `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        // Chat lines are tiny; don't let Nagle hold them back.
        stream
            .set_nodelay(true)
            .map_err(TransportError::SendFailed)?;
        let peer = stream
            .peer_addr()
            .map_err(TransportError::ReceiveFailed)?;
        tracing::info!(%peer, "connected to chat server");
        Ok(Self { stream, peer })
    }

    /// Address of the remote server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Splits the connection into its read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }
}
