//! Endpoint configuration.

use std::{future::Future, io, time::Duration};

/// Deadlines applied to transport operations.
///
/// `None` waits indefinitely. A deadline that expires is reported as a
/// failure of the phase it bounded (dial, read, write or close).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Bound on establishing the connection
    pub dial_timeout: Option<Duration>,
    /// Bound on waiting for a single inbound frame
    pub read_timeout: Option<Duration>,
    /// Bound on a single outbound write
    pub write_timeout: Option<Duration>,
    /// Bound on the close handshake or abortive teardown
    pub close_timeout: Option<Duration>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Some(Duration::from_secs(30)),
            read_timeout: None,
            write_timeout: Some(Duration::from_secs(10)),
            close_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl EndpointConfig {
    /// Configuration with every deadline disabled.
    pub fn unbounded() -> Self {
        Self { dial_timeout: None, read_timeout: None, write_timeout: None, close_timeout: None }
    }

    /// Set the dial deadline
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the read deadline
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write deadline
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the close deadline
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.close_timeout = timeout;
        self
    }
}

/// Run `operation`, failing with `TimedOut` if `limit` elapses first.
pub(crate) async fn with_deadline<F, T>(limit: Option<Duration>, operation: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    let Some(limit) = limit else {
        return operation.await;
    };

    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            Err(io::Error::new(io::ErrorKind::TimedOut, format!("timed out after {limit:?}")))
        },
    }
}
