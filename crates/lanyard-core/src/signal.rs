//! One-shot closed-signal.
//!
//! Tells the read loop (and a pending dial) to stop. Signalling is
//! non-blocking and idempotent: the first call flips the flag and wakes
//! every waiter, later calls do nothing.
//!
//! The signal only says "stop". Whether a terminal event has already been
//! delivered is tracked separately by the endpoint's event gate.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-shot cancellation flag with async wait.
#[derive(Debug, Default)]
pub struct ClosedSignal {
    set: AtomicBool,
    notify: Notify,
}

impl ClosedSignal {
    /// Create an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal.
    ///
    /// Returns true for the call that actually set it.
    pub fn signal(&self) -> bool {
        let first = !self.set.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Check the signal without waiting
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Wait until the signal is set.
    ///
    /// Returns immediately if it already is.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);

        // Register before checking the flag so a concurrent signal between
        // the check and the await is not lost.
        notified.as_mut().enable();
        if self.is_set() {
            return;
        }

        notified.await;
    }
}
