//! Delegate that records every callback.

use std::sync::{Mutex, MutexGuard, PoisonError};

use lanyard_core::{Delegate, EndpointError, EndpointEvent};
use tokio::sync::Notify;

/// Records delegate callbacks in the order they arrive.
///
/// Tests hold it in an `Arc`, hand the endpoint a reference, and then await
/// the events they expect.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<EndpointEvent>>,
    changed: Notify,
}

impl RecordingDelegate {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<EndpointEvent> {
        self.lock().clone()
    }

    /// Payloads received so far
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                EndpointEvent::Message(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of terminal events (`on_close` plus `on_error`) so far
    pub fn terminal_count(&self) -> usize {
        self.lock().iter().filter(|event| event.is_terminal()).count()
    }

    /// Whether `on_open` was received
    pub fn opened(&self) -> bool {
        self.lock().contains(&EndpointEvent::Opened)
    }

    /// Wait until `predicate` holds for the recorded events.
    pub async fn wait_until(&self, predicate: impl Fn(&[EndpointEvent]) -> bool) {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if predicate(&self.lock()) {
                return;
            }

            changed.await;
        }
    }

    /// Wait for the terminal event and return it.
    pub async fn wait_for_terminal(&self) -> EndpointEvent {
        self.wait_until(|events| events.iter().any(EndpointEvent::is_terminal)).await;

        self.lock()
            .iter()
            .find(|event| event.is_terminal())
            .cloned()
            .unwrap_or(EndpointEvent::Closed)
    }

    /// Wait until `on_open` has been received.
    pub async fn wait_for_open(&self) {
        self.wait_until(|events| events.contains(&EndpointEvent::Opened)).await;
    }

    /// Wait until at least `count` payloads have been received.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<String> {
        self.wait_until(|events| {
            events.iter().filter(|event| matches!(event, EndpointEvent::Message(_))).count()
                >= count
        })
        .await;

        self.messages()
    }

    fn record(&self, event: EndpointEvent) {
        self.lock().push(event);
        self.changed.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EndpointEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Delegate for RecordingDelegate {
    fn on_open(&self) {
        self.record(EndpointEvent::Opened);
    }

    fn on_close(&self) {
        self.record(EndpointEvent::Closed);
    }

    fn on_error(&self, error: EndpointError) {
        self.record(EndpointEvent::Failed(error));
    }

    fn on_message(&self, payload: String) {
        self.record(EndpointEvent::Message(payload));
    }
}
