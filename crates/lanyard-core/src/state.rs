//! Endpoint lifecycle state machine.
//!
//! Pure transition logic with no I/O: the [`crate::Endpoint`] consults it
//! under a lock before acting, so that concurrent callers and tasks agree
//! on what is allowed.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  open   ┌────────────┐  dial ok  ┌──────┐  close  ┌─────────┐
//! │ Idle │────────>│ Connecting │──────────>│ Open │────────>│ Closing │
//! └──────┘         └────────────┘           └──────┘         └─────────┘
//!                        │                      │                 │
//!                        │ dial error           │ read/write error│ done
//!                        ↓                      ↓                 ↓
//!                   ┌────────┐             ┌────────┐        ┌────────┐
//!                   │ Closed │             │ Closed │        │ Closed │
//!                   └────────┘             └────────┘        └────────┘
//! ```
//!
//! `close` is also accepted while Connecting; the pending dial is then
//! abandoned.

use crate::error::StateError;

/// Endpoint lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Constructed, nothing started
    Idle,
    /// Dial in progress
    Connecting,
    /// Connection established, read loop running
    Open,
    /// Close requested, teardown in progress
    Closing,
    /// Terminal
    Closed,
}

/// Lifecycle state machine for one endpoint.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: EndpointState,
}

impl Lifecycle {
    /// Create a lifecycle in Idle state
    pub fn new() -> Self {
        Self { state: EndpointState::Idle }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Transition Idle to Connecting.
    ///
    /// # Errors
    /// Returns `StateError` if not Idle. Endpoints are not reopened.
    pub fn begin_open(&mut self) -> Result<(), StateError> {
        if self.state != EndpointState::Idle {
            return Err(StateError { state: self.state, operation: "open" });
        }

        self.state = EndpointState::Connecting;
        Ok(())
    }

    /// Transition Connecting to Open once the dial has succeeded.
    ///
    /// # Errors
    /// Returns `StateError` if a close arrived while dialing.
    pub fn mark_open(&mut self) -> Result<(), StateError> {
        if self.state != EndpointState::Connecting {
            return Err(StateError { state: self.state, operation: "complete open" });
        }

        self.state = EndpointState::Open;
        Ok(())
    }

    /// Transition Connecting or Open to Closing.
    ///
    /// Returns the state the close was requested from.
    ///
    /// # Errors
    /// Returns `StateError` from Idle, Closing or Closed.
    pub fn begin_close(&mut self) -> Result<EndpointState, StateError> {
        match self.state {
            EndpointState::Connecting | EndpointState::Open => {
                let prior = self.state;
                self.state = EndpointState::Closing;
                Ok(prior)
            },
            state => Err(StateError { state, operation: "close" }),
        }
    }

    /// Transition to Closed from any state.
    ///
    /// Returns the state that was left.
    pub fn mark_closed(&mut self) -> EndpointState {
        std::mem::replace(&mut self.state, EndpointState::Closed)
    }

    /// Check whether writes may be dispatched
    #[must_use]
    pub fn accepts_writes(&self) -> bool {
        self.state == EndpointState::Open
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
