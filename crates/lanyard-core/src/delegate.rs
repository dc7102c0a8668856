//! Delegate contract between an endpoint and its owner.
//!
//! The endpoint holds only a weak reference to its delegate. If the owner
//! drops the delegate, later events are discarded.

use tokio::sync::mpsc;

use crate::{error::EndpointError, event::EndpointEvent};

/// Receives lifecycle and data callbacks from an [`crate::Endpoint`].
///
/// Callbacks are invoked one at a time, in the order the endpoint produced
/// them, from a dedicated dispatcher task. They must not block for long:
/// a slow callback delays every later event of the same endpoint.
///
/// Per endpoint the delegate observes at most one `on_open`, any number of
/// `on_message` after it, and exactly one terminal `on_close` or `on_error`
/// once the endpoint has been opened.
pub trait Delegate: Send + Sync + 'static {
    /// Connection established; the read loop is about to start.
    fn on_open(&self);

    /// Connection terminated cleanly, locally or by the peer. Terminal.
    fn on_close(&self);

    /// Connection failed while dialing, reading, writing or closing.
    /// Terminal.
    fn on_error(&self, error: EndpointError);

    /// One non-empty payload, in arrival order.
    fn on_message(&self, payload: String);
}

/// Delegate that forwards every callback into an unbounded channel.
///
/// Lets an owner consume events on its own task, e.g. inside a
/// `tokio::select!` loop.
#[derive(Debug)]
pub struct ChannelDelegate {
    events: mpsc::UnboundedSender<EndpointEvent>,
}

impl ChannelDelegate {
    /// Create the delegate and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EndpointEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    fn forward(&self, event: EndpointEvent) {
        // Receiver gone means the owner stopped listening
        let _ = self.events.send(event);
    }
}

impl Delegate for ChannelDelegate {
    fn on_open(&self) {
        self.forward(EndpointEvent::Opened);
    }

    fn on_close(&self) {
        self.forward(EndpointEvent::Closed);
    }

    fn on_error(&self, error: EndpointError) {
        self.forward(EndpointEvent::Failed(error));
    }

    fn on_message(&self, payload: String) {
        self.forward(EndpointEvent::Message(payload));
    }
}
