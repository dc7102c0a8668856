//! Test harness for Lanyard endpoints.
//!
//! Two kinds of transport are provided:
//!
//! - [`MockTransport`]: in-memory and scripted. A [`MockPeer`] feeds inbound
//!   frames, observes outbound ones and injects read, write and close
//!   failures. Runs on any Tokio runtime.
//! - [`SimTransport`]: real WebSocket framing over Turmoil's deterministic
//!   TCP, with [`SimServer`] as the accepting side. Supports packet loss,
//!   latency and partitions.
//!
//! [`RecordingDelegate`] captures every delegate callback for assertions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mock_transport;
pub mod recording;
pub mod sim_server;
pub mod sim_transport;

pub use mock_transport::{MockPeer, MockTransport, Written};
pub use recording::RecordingDelegate;
pub use sim_server::SimServer;
pub use sim_transport::SimTransport;
