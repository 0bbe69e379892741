//! Polling event source
//!
//! Observes process life-cycle by diffing `sysinfo` snapshots: processes that
//! appear between two cycles are reported as `exec`, processes that vanish as
//! `exit`. File-system and fork events are not observable this way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info};
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

use crate::events::{EventKind, EventMask, RawEvent};
use crate::models::Pid;
use crate::monitor::process_tracker::{ProcessSnapshot, ProcessTracker};
use crate::monitor::source::{join_worker, EventSource, RawEventHandler, SubscriptionError};
use crate::process::record_from_sysinfo;

/// Event kinds this source can observe
const OBSERVABLE_KINDS: [EventKind; 2] = [EventKind::Exec, EventKind::Exit];

pub struct PollingEventSource {
    interval: Duration,
}

pub struct PollingSubscription {
    running: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl PollingEventSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl EventSource for PollingEventSource {
    type Subscription = PollingSubscription;

    fn subscribe(
        &self,
        mask: &EventMask,
        handler: RawEventHandler,
    ) -> Result<PollingSubscription, SubscriptionError> {
        let kinds: Vec<EventKind> =
            OBSERVABLE_KINDS.into_iter().filter(|kind| mask.contains(*kind)).collect();
        if kinds.is_empty() {
            return Err(SubscriptionError::Rejected(
                "polling can only observe exec and exit events".to_string(),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let interval = self.interval;
        let worker = std::thread::Builder::new()
            .name("filemonitor-poll".to_string())
            .spawn(move || poll_loop(interval, &kinds, &handler, &worker_running))
            .map_err(|e| {
                SubscriptionError::Rejected(format!("cannot spawn polling thread: {}", e))
            })?;

        info!("Polling for process events every {:.1}s", self.interval.as_secs_f64());
        Ok(PollingSubscription { running, worker })
    }

    fn unsubscribe(&self, subscription: PollingSubscription) -> Result<(), SubscriptionError> {
        subscription.running.store(false, Ordering::SeqCst);
        subscription.worker.thread().unpark();
        join_worker(subscription.worker)
    }
}

/// One polling cycle at a time: refresh, diff against the previous cycle,
/// report the differences
struct Poller {
    system: System,
    tracker: ProcessTracker,
    report_exec: bool,
    report_exit: bool,
}

impl Poller {
    fn new(kinds: &[EventKind]) -> Self {
        Self {
            system: System::new(),
            tracker: ProcessTracker::new(),
            report_exec: kinds.contains(&EventKind::Exec),
            report_exit: kinds.contains(&EventKind::Exit),
        }
    }

    fn poll_once(&mut self, handler: &RawEventHandler) {
        self.system.refresh_processes();
        let changes = self.tracker.detect_changes(create_process_snapshot(&self.system));

        if self.report_exec {
            for process in changes.started {
                handler(&RawEvent::new(EventKind::Exec.code(), process));
            }
        }
        if self.report_exit {
            for process in changes.exited {
                handler(&RawEvent::new(EventKind::Exit.code(), process));
            }
        }
    }
}

fn poll_loop(
    interval: Duration,
    kinds: &[EventKind],
    handler: &RawEventHandler,
    running: &AtomicBool,
) {
    let mut poller = Poller::new(kinds);

    while running.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();
        poller.poll_once(handler);

        // Sleep out the rest of the interval; unsubscribe unparks us early
        while running.load(Ordering::SeqCst) {
            match interval.checked_sub(cycle_start.elapsed()) {
                Some(remaining) if !remaining.is_zero() => std::thread::park_timeout(remaining),
                _ => break,
            }
        }
    }
    debug!("Polling worker exiting");
}

fn create_process_snapshot(system: &System) -> ProcessSnapshot {
    let processes = system
        .processes()
        .iter()
        .map(|(pid, process)| {
            let pid = pid.as_u32() as Pid;
            ((pid, process.start_time()), record_from_sysinfo(pid, process))
        })
        .collect();
    ProcessSnapshot { processes }
}
