//! Accepting side of a simulated WebSocket connection.

use std::io;

use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite};
use turmoil::net::{TcpListener, TcpStream};

/// WebSocket listener for a Turmoil host.
///
/// Scenario servers drive the accepted [`WebSocketStream`] directly, which
/// keeps them independent of the endpoint under test.
pub struct SimServer {
    listener: TcpListener,
}

impl SimServer {
    /// Bind to `addr` (for example `"0.0.0.0:9000"`).
    ///
    /// # Errors
    ///
    /// Returns the bind failure.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept one connection and complete the server handshake.
    ///
    /// # Errors
    ///
    /// Returns the accept failure or a handshake error.
    pub async fn accept(&self) -> io::Result<WebSocketStream<TcpStream>> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::debug!(%peer, "accepted simulated connection");

        accept_async(stream).await.map_err(|err| match err {
            tungstenite::Error::Io(err) => err,
            other => io::Error::other(other),
        })
    }
}
