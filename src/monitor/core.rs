//! Monitor orchestration
//!
//! [`FileMonitor`] owns the subscription lifecycle and routes every raw
//! event through the translator into the caller's callback, in the order
//! the source delivers them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use serde::Serialize;

use crate::events::{EventMask, RawEvent};
use crate::models::Event;
use crate::monitor::source::{EventSource, RawEventHandler, SubscriptionError};
use crate::translate::EventTranslator;

/// Delivery counters shared with the event handler
#[derive(Debug, Default)]
struct MonitorStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events translated and handed to the callback
    pub delivered: u64,
    /// Events dropped because they could not be translated
    pub dropped: u64,
}

/// Subscription lifecycle, the only mutable orchestrator state
enum Slot<T> {
    Idle,
    /// `subscribe` is in progress; the lock is not held across it
    Starting,
    /// `stop` arrived while starting; the new subscription is torn down
    StopRequested,
    Running(T),
}

pub struct FileMonitor<S: EventSource> {
    source: S,
    translator: Arc<EventTranslator>,
    mask: EventMask,
    slot: Mutex<Slot<S::Subscription>>,
    stats: Arc<MonitorStats>,
}

impl<S: EventSource> FileMonitor<S> {
    pub fn new(source: S, translator: EventTranslator, mask: EventMask) -> Self {
        Self {
            source,
            translator: Arc::new(translator),
            mask,
            slot: Mutex::new(Slot::Idle),
            stats: Arc::new(MonitorStats::default()),
        }
    }

    /// Subscribe to the event source and deliver each translated event to
    /// `callback`.
    ///
    /// The callback runs on the source's worker context, possibly
    /// concurrently with `start`/`stop` callers, and may itself call
    /// `stop`, even while the source is still inside `subscribe`. Fails
    /// without subscribing again when already running.
    pub fn start<F>(&self, callback: F) -> Result<(), SubscriptionError>
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        {
            let mut slot = self.lock_slot();
            if !matches!(*slot, Slot::Idle) {
                return Err(SubscriptionError::AlreadyRunning);
            }
            *slot = Slot::Starting;
        }

        let translator = Arc::clone(&self.translator);
        let stats = Arc::clone(&self.stats);
        let handler: RawEventHandler =
            Arc::new(move |raw: &RawEvent| match translator.translate(raw) {
                Ok(event) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                    callback(event);
                }
                Err(e) => {
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("Dropping event from pid {}: {}", raw.process.pid, e);
                }
            });

        let result = self.source.subscribe(&self.mask, handler);
        let mut slot = self.lock_slot();
        let subscription = match result {
            Ok(subscription) => subscription,
            Err(e) => {
                *slot = Slot::Idle;
                return Err(e);
            }
        };

        if matches!(*slot, Slot::StopRequested) {
            *slot = Slot::Idle;
            drop(slot);
            self.source.unsubscribe(subscription)?;
            info!("Monitoring stopped while starting");
            return Ok(());
        }

        *slot = Slot::Running(subscription);
        info!(
            "Monitoring started for: {}",
            self.mask.iter().map(|kind| kind.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }

    /// Tear down the subscription. A no-op when not running.
    ///
    /// Only new deliveries are prevented; a callback already running
    /// finishes. The monitor is idle afterwards even if the source reports
    /// a teardown error.
    pub fn stop(&self) -> Result<(), SubscriptionError> {
        let subscription = {
            let mut slot = self.lock_slot();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Running(subscription) => subscription,
                Slot::Starting | Slot::StopRequested => {
                    *slot = Slot::StopRequested;
                    return Ok(());
                }
                Slot::Idle => return Ok(()),
            }
        };
        self.source.unsubscribe(subscription)?;
        info!("Monitoring stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Running(_) | Slot::Starting)
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<S::Subscription>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: EventSource> Drop for FileMonitor<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop monitor on drop: {}", e);
        }
    }
}
