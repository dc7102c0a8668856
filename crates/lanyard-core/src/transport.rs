//! Transport abstraction for a single full-duplex connection.
//!
//! A [`Transport`] dials a target and yields the connection split into an
//! outbound [`FrameSink`] and an inbound [`FrameStream`]. The endpoint gives
//! each half to exactly one task: the writer owns the sink and the read loop
//! owns the stream, so no half is ever used concurrently.
//!
//! Production uses WebSocket (`crate::ws`), tests use an in-memory mock or
//! turmoil's simulated TCP.

use std::io;

use async_trait::async_trait;

/// Close code for a normal, orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Code and reason carried by a close handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close status code
    pub code: u16,
    /// Optional human-readable reason
    pub reason: String,
}

impl CloseFrame {
    /// A normal closure with an empty reason
    pub fn normal() -> Self {
        Self { code: NORMAL_CLOSURE, reason: String::new() }
    }
}

/// Something read from the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// An application payload, possibly empty
    Payload(String),

    /// The peer started the close handshake
    Close(CloseFrame),
}

/// Dials connections to a target.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Outbound half of a connection.
    type Sink: FrameSink;

    /// Inbound half of a connection.
    type Stream: FrameStream;

    /// Connect to `target`.
    ///
    /// Waits for the connection (and any handshake) to complete and returns
    /// its two halves.
    async fn dial(&self, target: &str) -> io::Result<(Self::Sink, Self::Stream)>;
}

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one application payload.
    async fn send_text(&mut self, payload: String) -> io::Result<()>;

    /// Send a close-handshake frame to the peer.
    ///
    /// The rest of the teardown is left to the peer and the transport.
    async fn send_close(&mut self, frame: CloseFrame) -> io::Result<()>;

    /// Tear the connection down immediately, without a handshake.
    async fn abort(&mut self) -> io::Result<()>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameStream: Send + 'static {
    /// Wait for the next payload or close handshake.
    ///
    /// Control traffic (pings, pongs) is handled inside the transport and
    /// never surfaces here.
    ///
    /// # Errors
    /// Returns an error if the connection failed or ended without a close
    /// handshake.
    async fn next_frame(&mut self) -> io::Result<Inbound>;
}
