//! Scripted in-memory transport.

use std::{
    io,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lanyard_core::{CloseFrame, FrameSink, FrameStream, Inbound, Transport};
use tokio::sync::mpsc;

/// Something the endpoint wrote to the mock connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    /// Application payload
    Payload(String),
    /// Close-handshake frame
    Close(CloseFrame),
    /// Abortive teardown
    Aborted,
}

/// Failures injected by the peer.
#[derive(Debug, Default)]
struct Faults {
    writes: AtomicBool,
    stall: AtomicBool,
    close: AtomicBool,
}

enum DialPlan {
    Connect(MockSink, MockStream),
    Refuse(String),
}

/// In-memory transport that dials exactly once.
///
/// Every behaviour is scripted: the dial either succeeds with a connection
/// whose far side is a [`MockPeer`], or is refused with a fixed reason.
/// A second dial fails.
pub struct MockTransport {
    plan: Mutex<Option<DialPlan>>,
    dial_delay: Option<Duration>,
}

impl MockTransport {
    /// A transport whose dial succeeds, and the peer on the other end.
    pub fn connected() -> (Self, MockPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = mpsc::unbounded_channel();
        let faults = Arc::new(Faults::default());

        let sink = MockSink { written: written_tx, faults: Arc::clone(&faults) };
        let stream = MockStream { inbound: inbound_rx };
        let transport = Self::with_plan(DialPlan::Connect(sink, stream));
        let peer = MockPeer { inbound: Some(inbound_tx), written: written_rx, faults };

        (transport, peer)
    }

    /// A transport whose dial is refused with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self::with_plan(DialPlan::Refuse(reason.into()))
    }

    /// Delay the dial outcome by `delay`.
    #[must_use]
    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    fn with_plan(plan: DialPlan) -> Self {
        Self { plan: Mutex::new(Some(plan)), dial_delay: None }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Sink = MockSink;
    type Stream = MockStream;

    async fn dial(&self, _target: &str) -> io::Result<(MockSink, MockStream)> {
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }

        let plan = self.plan.lock().unwrap_or_else(PoisonError::into_inner).take();
        match plan {
            Some(DialPlan::Connect(sink, stream)) => Ok((sink, stream)),
            Some(DialPlan::Refuse(reason)) => {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, reason))
            },
            None => Err(io::Error::other("mock transport already dialed")),
        }
    }
}

/// Outbound half of a mock connection.
pub struct MockSink {
    written: mpsc::UnboundedSender<Written>,
    faults: Arc<Faults>,
}

impl MockSink {
    fn record(&self, written: Written) -> io::Result<()> {
        self.written
            .send(written)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, payload: String) -> io::Result<()> {
        if self.faults.stall.load(Ordering::Acquire) {
            // Peer stopped reading
            return std::future::pending().await;
        }
        if self.faults.writes.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.record(Written::Payload(payload))
    }

    async fn send_close(&mut self, frame: CloseFrame) -> io::Result<()> {
        if self.faults.close.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "close rejected"));
        }
        self.record(Written::Close(frame))
    }

    async fn abort(&mut self) -> io::Result<()> {
        if self.faults.close.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "close rejected"));
        }
        self.record(Written::Aborted)
    }
}

/// Inbound half of a mock connection.
pub struct MockStream {
    inbound: mpsc::UnboundedReceiver<io::Result<Inbound>>,
}

#[async_trait]
impl FrameStream for MockStream {
    async fn next_frame(&mut self) -> io::Result<Inbound> {
        match self.inbound.recv().await {
            Some(next) => next,
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer hung up")),
        }
    }
}

/// Far side of a [`MockTransport`] connection.
///
/// Frames and failures pushed here are observed by the endpoint's read
/// loop in order. Nothing is delivered until the endpoint has dialed.
pub struct MockPeer {
    inbound: Option<mpsc::UnboundedSender<io::Result<Inbound>>>,
    written: mpsc::UnboundedReceiver<Written>,
    faults: Arc<Faults>,
}

impl MockPeer {
    /// Deliver one payload to the endpoint.
    pub fn deliver(&self, payload: impl Into<String>) {
        self.push(Ok(Inbound::Payload(payload.into())));
    }

    /// Start the close handshake from the peer side.
    pub fn close_handshake(&self, code: u16, reason: impl Into<String>) {
        self.push(Ok(Inbound::Close(CloseFrame { code, reason: reason.into() })));
    }

    /// Make the endpoint's next read fail with `description`.
    pub fn fail_read(&self, description: impl Into<String>) {
        self.push(Err(io::Error::new(io::ErrorKind::ConnectionReset, description.into())));
    }

    /// Drop the connection without a close handshake.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Make every later write fail.
    pub fn fail_writes(&self) {
        self.faults.writes.store(true, Ordering::Release);
    }

    /// Make every later write block forever, as if the peer stopped
    /// reading.
    pub fn stall_writes(&self) {
        self.faults.stall.store(true, Ordering::Release);
    }

    /// Make the close handshake and abortive teardown fail.
    pub fn fail_close(&self) {
        self.faults.close.store(true, Ordering::Release);
    }

    /// Wait for the next thing the endpoint wrote.
    ///
    /// Returns `None` once the endpoint has released the connection and
    /// everything written has been observed.
    pub async fn next_written(&mut self) -> Option<Written> {
        self.written.recv().await
    }

    /// Next thing the endpoint wrote, if any is pending.
    pub fn try_written(&mut self) -> Option<Written> {
        self.written.try_recv().ok()
    }

    fn push(&self, next: io::Result<Inbound>) {
        if let Some(inbound) = &self.inbound {
            // Endpoint already released the connection
            let _ = inbound.send(next);
        }
    }
}
