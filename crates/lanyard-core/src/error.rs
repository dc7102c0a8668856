//! Error types for the endpoint core.
//!
//! Two layers of errors exist:
//! - [`EndpointError`]: transport failures, reported to the delegate
//! - [`StateError`]: operations attempted in the wrong lifecycle state,
//!   logged by the endpoint and never surfaced to callers
//!
//! Transport implementations speak `std::io::Error`; the endpoint converts
//! at the boundary, tagging each failure with the phase it happened in.

use std::{fmt, io};

use thiserror::Error;

use crate::state::EndpointState;

/// Lifecycle phase in which a transport failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Establishing the connection
    Dial,
    /// Waiting for an inbound frame
    Read,
    /// Writing an outbound payload
    Write,
    /// Performing the close handshake or teardown
    Close,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dial => "dial",
            Self::Read => "read",
            Self::Write => "write",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// A transport failure delivered to the delegate through `on_error`.
///
/// The taxonomy is deliberately flat: every variant carries a [`Failure`]
/// with a human-readable description. Owners distinguish failures by when
/// they arrive (or by [`EndpointError::phase`]), not by structured codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The connection could not be established
    #[error("dial failed: {0}")]
    Dial(Failure),

    /// Reading from an open connection failed
    #[error("read failed: {0}")]
    Read(Failure),

    /// Writing a payload failed
    #[error("write failed: {0}")]
    Write(Failure),

    /// The close handshake or teardown failed
    #[error("close failed: {0}")]
    Close(Failure),
}

/// Description of a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    description: String,
    timed_out: bool,
}

impl Failure {
    /// A failure reported by the transport
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), timed_out: false }
    }

    /// A failure caused by a deadline expiring
    pub fn timed_out(description: impl Into<String>) -> Self {
        Self { description: description.into(), timed_out: true }
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether a deadline expired
    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl From<&str> for Failure {
    fn from(description: &str) -> Self {
        Self::new(description)
    }
}

impl From<String> for Failure {
    fn from(description: String) -> Self {
        Self::new(description)
    }
}

impl EndpointError {
    /// Builds an error for `phase` from a transport failure.
    ///
    /// `io::ErrorKind::TimedOut` marks the failure as a timeout.
    pub fn from_io(phase: Phase, err: &io::Error) -> Self {
        let failure = if err.kind() == io::ErrorKind::TimedOut {
            Failure::timed_out(err.to_string())
        } else {
            Failure::new(err.to_string())
        };

        match phase {
            Phase::Dial => Self::Dial(failure),
            Phase::Read => Self::Read(failure),
            Phase::Write => Self::Write(failure),
            Phase::Close => Self::Close(failure),
        }
    }

    /// Phase in which the failure occurred.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Dial(_) => Phase::Dial,
            Self::Read(_) => Phase::Read,
            Self::Write(_) => Phase::Write,
            Self::Close(_) => Phase::Close,
        }
    }

    /// The underlying failure
    pub fn failure(&self) -> &Failure {
        match self {
            Self::Dial(f) | Self::Read(f) | Self::Write(f) | Self::Close(f) => f,
        }
    }

    /// The underlying description, without the phase prefix.
    pub fn description(&self) -> &str {
        self.failure().description()
    }

    /// Returns true if the failure was a deadline expiring.
    pub fn is_timeout(&self) -> bool {
        self.failure().is_timeout()
    }
}

/// An operation was attempted in a state that does not permit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} while {state:?}")]
pub struct StateError {
    /// State the endpoint was in
    pub state: EndpointState,
    /// Operation that was attempted
    pub operation: &'static str,
}
