//! Lanyard endpoint core
//!
//! A single-connection asynchronous transport adapter. An [`Endpoint`] owns
//! one full-duplex connection to a remote target and reports its lifecycle
//! to a [`Delegate`]: opened, message received, closed, or failed.
//!
//! # Architecture
//!
//! The caller-facing operations (`open`, `send`, `close`) never block and
//! never return results. Each one hands work to a task on the Tokio runtime
//! and the outcome surfaces later as a delegate callback.
//!
//! Per endpoint, four tasks cooperate:
//!
//! - the open task dials the transport,
//! - the read loop forwards inbound payloads until the closed-signal fires,
//! - the writer owns the outbound half and executes writes in call order,
//! - the dispatcher invokes delegate callbacks one at a time.
//!
//! Exactly one terminal event (`on_close` or `on_error`) reaches the
//! delegate per endpoint, and nothing is delivered after it.
//!
//! # Components
//!
//! - [`endpoint`]: Endpoint and its task orchestration
//! - [`delegate`]: Delegate trait and the channel-backed adapter
//! - [`event`]: Endpoint events as values
//! - [`state`]: Lifecycle state machine (pure, no I/O)
//! - [`signal`]: One-shot closed-signal
//! - [`config`]: Deadlines for dial, read, write and close
//! - [`transport`]: Transport abstraction (sink and stream halves)
//! - [`error`]: Error types
//! - `ws`: WebSocket transport (feature `websocket`)

pub mod config;
pub mod delegate;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod signal;
pub mod state;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod ws;

pub use config::EndpointConfig;
pub use delegate::{ChannelDelegate, Delegate};
pub use endpoint::Endpoint;
pub use error::{EndpointError, Failure, Phase, StateError};
pub use event::EndpointEvent;
pub use state::{EndpointState, Lifecycle};
pub use transport::{CloseFrame, FrameSink, FrameStream, Inbound, NORMAL_CLOSURE, Transport};
