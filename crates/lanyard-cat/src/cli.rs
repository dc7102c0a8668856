//! Command-line arguments.

use std::time::Duration;

use clap::Parser;
use lanyard_core::EndpointConfig;

/// Pipe stdin lines to a WebSocket endpoint and print received payloads.
///
/// Timeouts are in seconds; 0 disables the bound.
#[derive(Debug, Parser)]
#[command(name = "lanyard-cat", version)]
pub struct Args {
    /// WebSocket URL to connect to (for example `ws://127.0.0.1:9000/chat`)
    pub url: String,

    /// Tear the connection down without a close handshake
    #[arg(long)]
    pub force_close: bool,

    /// Bound on establishing the connection
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub dial_timeout: u64,

    /// Bound on waiting for each inbound frame
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub read_timeout: u64,

    /// Bound on each outbound write
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub write_timeout: u64,

    /// Bound on the close handshake
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub close_timeout: u64,
}

impl Args {
    /// Endpoint configuration described by the timeout flags.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig::default()
            .with_dial_timeout(seconds(self.dial_timeout))
            .with_read_timeout(seconds(self.read_timeout))
            .with_write_timeout(seconds(self.write_timeout))
            .with_close_timeout(seconds(self.close_timeout))
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
