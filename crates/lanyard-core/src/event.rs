//! Endpoint events as values.
//!
//! The endpoint never calls the delegate directly from its I/O tasks.
//! Instead it emits [`EndpointEvent`]s into a single-consumer channel and a
//! dispatcher task replays them onto the delegate in order.

use crate::{delegate::Delegate, error::EndpointError};

/// A lifecycle or data event produced by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// Connection established
    Opened,

    /// Non-empty payload received
    Message(String),

    /// Connection terminated cleanly
    Closed,

    /// Connection failed
    Failed(EndpointError),
}

impl EndpointEvent {
    /// Returns true for `Closed` and `Failed`, after which nothing follows.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }

    /// Invoke the matching delegate callback.
    pub fn dispatch_to(self, delegate: &dyn Delegate) {
        match self {
            Self::Opened => delegate.on_open(),
            Self::Message(payload) => delegate.on_message(payload),
            Self::Closed => delegate.on_close(),
            Self::Failed(error) => delegate.on_error(error),
        }
    }
}
