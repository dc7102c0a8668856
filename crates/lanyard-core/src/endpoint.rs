//! Transport endpoint: one connection, one delegate.
//!
//! # Tasks
//!
//! ```text
//!  open() ──> open task ──dial──> spawn writer + read loop
//!                                       │            │
//!  send()/close(false) ──> outbound ──> writer       │
//!  close(true) ─────────> abort ─────> writer        │
//!                                       │            │
//!                                       └──> events <┘ ──> dispatcher ──> Delegate
//! ```
//!
//! # Terminal events
//!
//! Two primitives coordinate shutdown:
//!
//! - the [`ClosedSignal`] tells the read loop and a pending dial to stop,
//! - the event gate lets exactly one terminal event through.
//!
//! The gate is the sender half of the event channel. Emitting a terminal
//! event takes the sender out of the gate, so whichever path finishes first
//! (local close, remote close, read, write or dial failure) is the only one
//! that reaches the delegate, and no event can be emitted after it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

use crate::{
    config::{EndpointConfig, with_deadline},
    delegate::Delegate,
    error::{EndpointError, Phase},
    event::EndpointEvent,
    signal::ClosedSignal,
    state::{EndpointState, Lifecycle},
    transport::{CloseFrame, FrameSink, FrameStream, Inbound, Transport},
};

/// Work queued for the writer task.
#[derive(Debug)]
enum Outbound {
    /// Application payload
    Payload(String),
    /// Graceful close handshake
    Close,
}

/// Owns a single transport connection and reports its lifecycle to a
/// [`Delegate`].
///
/// All operations return immediately; their outcomes arrive as delegate
/// callbacks. Operations must be called from within a Tokio runtime.
///
/// An endpoint is single-use: once Closed it stays Closed, and a fresh
/// endpoint should be constructed for a new connection attempt.
///
/// Dropping an endpoint that is still connecting, open or closing
/// force-closes it.
pub struct Endpoint<T: Transport> {
    shared: Arc<Shared<T>>,
}

struct Shared<T: Transport> {
    target: String,
    transport: T,
    config: EndpointConfig,
    delegate: Weak<dyn Delegate>,
    lifecycle: Mutex<Lifecycle>,
    closed: ClosedSignal,
    /// Forced close request for the writer
    abort: Notify,
    /// Present only while Open
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    /// Event gate; taken by the terminal event
    events: Mutex<Option<mpsc::UnboundedSender<EndpointEvent>>>,
}

impl<T: Transport> Endpoint<T> {
    /// Create an idle endpoint for `target`.
    ///
    /// Only a weak reference to `delegate` is kept.
    pub fn new<D: Delegate>(
        target: impl Into<String>,
        transport: T,
        delegate: &Arc<D>,
        config: EndpointConfig,
    ) -> Self {
        let delegate: Arc<dyn Delegate> = Arc::clone(delegate) as Arc<dyn Delegate>;
        Self::with_weak_delegate(target, transport, Arc::downgrade(&delegate), config)
    }

    /// Create an idle endpoint from an existing weak delegate reference.
    pub fn with_weak_delegate(
        target: impl Into<String>,
        transport: T,
        delegate: Weak<dyn Delegate>,
        config: EndpointConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                target: target.into(),
                transport,
                config,
                delegate,
                lifecycle: Mutex::new(Lifecycle::new()),
                closed: ClosedSignal::new(),
                abort: Notify::new(),
                outbound: Mutex::new(None),
                events: Mutex::new(None),
            }),
        }
    }

    /// Address this endpoint connects to
    pub fn target(&self) -> &str {
        &self.shared.target
    }

    /// Current lifecycle state
    pub fn state(&self) -> EndpointState {
        lock(&self.shared.lifecycle).state()
    }

    /// Start connecting.
    ///
    /// Returns immediately. The delegate later receives `on_open` followed by
    /// messages, or `on_error` if the dial fails. Ignored unless Idle.
    pub fn open(&self) {
        if let Err(err) = lock(&self.shared.lifecycle).begin_open() {
            warn!(target_addr = %self.shared.target, %err, "ignoring open");
            return;
        }

        let (events, rx) = mpsc::unbounded_channel();
        *lock(&self.shared.events) = Some(events);
        tokio::spawn(dispatch(rx, self.shared.delegate.clone()));

        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.connect());
    }

    /// Queue `payload` for writing.
    ///
    /// Returns immediately. Writes happen in call order on the writer task.
    /// A failed write is reported through `on_error` and closes the
    /// endpoint. Ignored unless Open.
    pub fn send(&self, payload: impl Into<String>) {
        let payload = payload.into();

        let lifecycle = lock(&self.shared.lifecycle);
        if !lifecycle.accepts_writes() {
            warn!(state = ?lifecycle.state(), "ignoring send");
            return;
        }
        drop(lifecycle);

        let outbound = lock(&self.shared.outbound);
        let Some(writer) = outbound.as_ref() else {
            debug!("endpoint finished, dropping send");
            return;
        };

        debug!(msg = %payload, "sent message");
        if writer.send(Outbound::Payload(payload)).is_err() {
            debug!("writer already stopped");
        }
    }

    /// Close the connection.
    ///
    /// With `force` the handle is torn down immediately; otherwise a
    /// close-handshake frame is sent first, after any payloads already
    /// queued. Either way the delegate receives exactly one of `on_close` or
    /// `on_error`. Closing while still connecting abandons the dial and
    /// reports `on_close`. A forced close while Closing tears down a
    /// handshake still in progress. Otherwise ignored unless Connecting or
    /// Open.
    pub fn close(&self, force: bool) {
        let prior = match lock(&self.shared.lifecycle).begin_close() {
            Ok(prior) => prior,
            Err(err) if force && err.state == EndpointState::Closing => {
                debug!(target_addr = %self.shared.target, "escalating close to abort");
                self.shared.abort.notify_one();
                return;
            },
            Err(err) => {
                warn!(target_addr = %self.shared.target, %err, "ignoring close");
                return;
            },
        };

        // Stop the read loop before touching the connection so the teardown
        // cannot surface as a read failure.
        self.shared.closed.signal();

        if prior != EndpointState::Open {
            // The open task sees the signal and finishes the endpoint
            return;
        }

        let writer = lock(&self.shared.outbound).take();
        if force {
            self.shared.abort.notify_one();
        } else if let Some(writer) = writer {
            if writer.send(Outbound::Close).is_err() {
                debug!("writer already stopped");
            }
        }
    }
}

impl<T: Transport> Drop for Endpoint<T> {
    fn drop(&mut self) {
        if matches!(
            self.state(),
            EndpointState::Connecting | EndpointState::Open | EndpointState::Closing
        ) {
            self.close(true);
        }
    }
}

impl<T: Transport> Shared<T> {
    /// Open task: dial, then hand the halves to the writer and read loop.
    async fn connect(self: Arc<Self>) {
        let dialed = tokio::select! {
            biased;
            () = self.closed.wait() => {
                debug!(target_addr = %self.target, "dial abandoned");
                self.finish(EndpointEvent::Closed);
                return;
            },
            dialed = with_deadline(self.config.dial_timeout, self.transport.dial(&self.target)) => dialed,
        };

        let (sink, stream) = match dialed {
            Ok(halves) => halves,
            Err(err) => {
                self.finish(EndpointEvent::Failed(EndpointError::from_io(Phase::Dial, &err)));
                return;
            },
        };

        let (writer, queue) = mpsc::unbounded_channel();
        {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.mark_open().is_err() {
                // Closed while the dial was completing
                drop(lifecycle);
                self.finish(EndpointEvent::Closed);
                return;
            }
            *lock(&self.outbound) = Some(writer);
        }

        debug!(target_addr = %self.target, "opened endpoint");
        self.emit(EndpointEvent::Opened);

        tokio::spawn(Arc::clone(&self).write_loop(sink, queue));
        tokio::spawn(self.read_loop(stream));
    }

    /// Writer task: sole owner of the outbound half.
    ///
    /// A forced close pre-empts both the queue and any write in flight.
    async fn write_loop(
        self: Arc<Self>,
        mut sink: T::Sink,
        mut queue: mpsc::UnboundedReceiver<Outbound>,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                () = self.abort.notified() => None,
                next = queue.recv() => match next {
                    Some(next) => Some(next),
                    // Endpoint finished; nothing left to write
                    None => break,
                },
            };

            let Some(next) = next else {
                self.teardown(&mut sink).await;
                break;
            };

            match next {
                Outbound::Payload(payload) => {
                    let written = tokio::select! {
                        biased;
                        () = self.abort.notified() => None,
                        result = with_deadline(self.config.write_timeout, sink.send_text(payload)) => Some(result),
                    };

                    match written {
                        None => {
                            self.teardown(&mut sink).await;
                            break;
                        },
                        Some(Ok(())) => {},
                        Some(Err(err)) => {
                            self.finish(EndpointEvent::Failed(EndpointError::from_io(Phase::Write, &err)));
                            if let Err(err) = sink.abort().await {
                                debug!(%err, "teardown after write failure");
                            }
                            break;
                        },
                    }
                },
                Outbound::Close => {
                    let closed = tokio::select! {
                        biased;
                        () = self.abort.notified() => None,
                        result = with_deadline(
                            self.config.close_timeout,
                            sink.send_close(CloseFrame::normal()),
                        ) => Some(result),
                    };

                    match closed {
                        None => self.teardown(&mut sink).await,
                        Some(result) => self.finish(close_outcome(result)),
                    }
                    break;
                },
            }
        }

        debug!("writer exited");
    }

    /// Abortive teardown of the outbound half, then the terminal event.
    async fn teardown(&self, sink: &mut T::Sink) {
        let result = with_deadline(self.config.close_timeout, sink.abort()).await;
        self.finish(close_outcome(result));
    }

    /// Read loop: forwards payloads until the closed-signal fires or a read
    /// fails.
    async fn read_loop(self: Arc<Self>, mut stream: T::Stream) {
        loop {
            if self.closed.is_set() {
                break;
            }

            let next = tokio::select! {
                biased;
                () = self.closed.wait() => break,
                next = with_deadline(self.config.read_timeout, stream.next_frame()) => next,
            };

            match next {
                Ok(Inbound::Payload(payload)) => {
                    if payload.is_empty() {
                        continue;
                    }
                    if self.closed.is_set() {
                        break;
                    }
                    debug!(msg = %payload, "read message");
                    self.emit(EndpointEvent::Message(payload));
                },
                Ok(Inbound::Close(frame)) => {
                    debug!(code = frame.code, reason = %frame.reason, "peer closed connection");
                    self.closed.signal();
                    self.finish(EndpointEvent::Closed);
                    break;
                },
                Err(err) => {
                    if self.closed.is_set() {
                        debug!(%err, "read ended after close");
                    } else {
                        self.finish(EndpointEvent::Failed(EndpointError::from_io(Phase::Read, &err)));
                    }
                    break;
                },
            }
        }

        debug!("read loop exited");
    }

    /// Emit a non-terminal event; dropped if the endpoint already finished.
    fn emit(&self, event: EndpointEvent) {
        if let Some(events) = lock(&self.events).as_ref() {
            let _ = events.send(event);
        }
    }

    /// Emit the terminal event and stop every task.
    ///
    /// Only the first call reaches the delegate.
    fn finish(&self, event: EndpointEvent) {
        let gate = lock(&self.events).take();

        self.closed.signal();
        lock(&self.outbound).take();
        self.abort.notify_one();
        lock(&self.lifecycle).mark_closed();

        let Some(events) = gate else {
            debug!(?event, "terminal event suppressed");
            return;
        };

        match &event {
            EndpointEvent::Failed(err) => warn!(target_addr = %self.target, %err, "endpoint failed"),
            _ => debug!(target_addr = %self.target, "endpoint closed"),
        }
        let _ = events.send(event);
    }
}

/// Dispatcher task: replays events onto the delegate, one at a time.
async fn dispatch(mut events: mpsc::UnboundedReceiver<EndpointEvent>, delegate: Weak<dyn Delegate>) {
    while let Some(event) = events.recv().await {
        let Some(delegate) = delegate.upgrade() else {
            debug!("delegate dropped, discarding events");
            break;
        };
        event.dispatch_to(delegate.as_ref());
    }
}

fn close_outcome(result: std::io::Result<()>) -> EndpointEvent {
    match result {
        Ok(()) => EndpointEvent::Closed,
        Err(err) => EndpointEvent::Failed(EndpointError::from_io(Phase::Close, &err)),
    }
}

/// Lock a mutex, recovering the data if a delegate callback panicked while
/// it was held elsewhere.
fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
