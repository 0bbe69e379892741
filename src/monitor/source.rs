//! Event source boundary
//!
//! An event source delivers raw events to a registered handler on its own
//! worker context. The handler only borrows each [`RawEvent`]; nothing may
//! hold on to it after the call returns.

use std::sync::Arc;

use crate::events::{EventMask, RawEvent};

/// Handler registered with an event source
pub type RawEventHandler = Arc<dyn Fn(&RawEvent) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Monitor is already running")]
    AlreadyRunning,
    #[error("Subscription rejected: {0}")]
    Rejected(String),
    #[error("Failed to tear down subscription: {0}")]
    Teardown(String),
}

pub trait EventSource: Send + Sync {
    type Subscription: Send;

    /// Start delivering events whose kinds are in `mask` to `handler`
    fn subscribe(
        &self,
        mask: &EventMask,
        handler: RawEventHandler,
    ) -> Result<Self::Subscription, SubscriptionError>;

    /// Stop delivering new events. Deliveries already in progress finish.
    fn unsubscribe(&self, subscription: Self::Subscription) -> Result<(), SubscriptionError>;
}

/// Join a worker thread unless called from that very thread (for example
/// when the monitor is stopped from inside its own callback)
pub(crate) fn join_worker(handle: std::thread::JoinHandle<()>) -> Result<(), SubscriptionError> {
    if handle.thread().id() == std::thread::current().id() {
        return Ok(());
    }
    handle
        .join()
        .map_err(|_| SubscriptionError::Teardown("event worker panicked".to_string()))
}
