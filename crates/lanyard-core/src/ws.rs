//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WsTransport`] dials `ws://` URLs over TCP. [`handshake`] runs the
//! client handshake over any byte stream, which lets simulated networks
//! reuse the same framing code.

use std::{borrow::Cow, io};

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use socket2::{SockRef, Socket};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, client_async, connect_async,
    tungstenite::{
        self, Message,
        client::IntoClientRequest,
        protocol::{CloseFrame as WsCloseFrame, frame::coding::CloseCode},
    },
};
use tracing::debug;

use crate::transport::{CloseFrame, FrameSink, FrameStream, Inbound, Transport};

/// Dials WebSocket connections over plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    /// Create the transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Sink = WsSink<MaybeTlsStream<TcpStream>>;
    type Stream = WsStream<MaybeTlsStream<TcpStream>>;

    async fn dial(&self, target: &str) -> io::Result<(Self::Sink, Self::Stream)> {
        let (socket, _response) = connect_async(target).await.map_err(into_io)?;

        let shutdown = match socket.get_ref() {
            MaybeTlsStream::Plain(tcp) => SockRef::from(tcp).try_clone().ok(),
            _ => None,
        };

        Ok(split(socket, shutdown))
    }
}

/// Run the client handshake for `request` over an established `stream`.
///
/// The returned sink cannot tear the stream down on its own; an abortive
/// close simply releases it.
pub async fn handshake<R, S>(request: R, stream: S) -> io::Result<(WsSink<S>, WsStream<S>)>
where
    R: IntoClientRequest + Unpin,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (socket, _response) = client_async(request, stream).await.map_err(into_io)?;
    Ok(split(socket, None))
}

fn split<S>(socket: WebSocketStream<S>, shutdown: Option<Socket>) -> (WsSink<S>, WsStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = socket.split();
    (WsSink { inner: sink, shutdown }, WsStream { inner: stream })
}

fn into_io(err: tungstenite::Error) -> io::Error {
    match err {
        tungstenite::Error::Io(err) => err,
        other => io::Error::other(other),
    }
}

/// Outbound half of a WebSocket connection.
pub struct WsSink<S> {
    inner: SplitSink<WebSocketStream<S>, Message>,
    /// Duplicate of the TCP socket, used for abortive teardown
    shutdown: Option<Socket>,
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_text(&mut self, payload: String) -> io::Result<()> {
        self.inner.send(Message::Text(payload)).await.map_err(into_io)
    }

    async fn send_close(&mut self, frame: CloseFrame) -> io::Result<()> {
        let frame =
            WsCloseFrame { code: CloseCode::from(frame.code), reason: Cow::Owned(frame.reason) };
        self.inner.send(Message::Close(Some(frame))).await.map_err(into_io)
    }

    async fn abort(&mut self) -> io::Result<()> {
        match self.shutdown.take() {
            Some(socket) => match socket.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                // Peer already hung up
                Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err),
            },
            None => {
                debug!("no socket handle, releasing stream");
                Ok(())
            },
        }
    }
}

/// Inbound half of a WebSocket connection.
pub struct WsStream<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameStream for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> io::Result<Inbound> {
        loop {
            let Some(message) = self.inner.next().await else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection ended without a close frame",
                ));
            };

            match message.map_err(into_io)? {
                Message::Text(text) => return Ok(Inbound::Payload(text)),
                Message::Binary(bytes) => {
                    return Ok(Inbound::Payload(String::from_utf8_lossy(&bytes).into_owned()));
                },
                Message::Close(frame) => {
                    let frame = frame.map_or(
                        CloseFrame { code: u16::from(CloseCode::Status), reason: String::new() },
                        |frame| CloseFrame {
                            code: u16::from(frame.code),
                            reason: frame.reason.into_owned(),
                        },
                    );
                    return Ok(Inbound::Close(frame));
                },
                // Pongs are queued by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
            }
        }
    }
}
