//! WebSocket transport over Turmoil's simulated TCP.

use std::io;

use async_trait::async_trait;
use lanyard_core::{
    Transport,
    ws::{self, WsSink, WsStream},
};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::debug;
use turmoil::net::TcpStream;

/// Dials `ws://host:port/...` targets inside a Turmoil simulation.
///
/// Host names resolve through Turmoil's DNS, so `ws://server:9000` reaches
/// the simulated host registered as `server`. Framing is the same code the
/// real transport uses. Abortive teardown releases the stream without a
/// close frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

impl SimTransport {
    /// Create the transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for SimTransport {
    type Sink = WsSink<TcpStream>;
    type Stream = WsStream<TcpStream>;

    async fn dial(&self, target: &str) -> io::Result<(Self::Sink, Self::Stream)> {
        let request = target
            .into_client_request()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        let host = request
            .uri()
            .host()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no host"))?;
        let port = request.uri().port_u16().unwrap_or(80);
        let addr = format!("{host}:{port}");

        debug!(%addr, "dialing simulated host");
        let stream = TcpStream::connect(addr.as_str()).await?;

        ws::handshake(request, stream).await
    }
}
