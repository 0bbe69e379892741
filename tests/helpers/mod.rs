#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use filemonitor::events::{EventMask, RawEvent, RawProcess};
use filemonitor::{
    EventSource, LookupFailure, Pid, ProcessLookup, RawEventHandler, SubscriptionError,
};

/// In-memory process table standing in for the live system
#[derive(Default)]
pub struct FakeProcessTable {
    processes: HashMap<Pid, RawProcess>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `pid` with the given parent
    pub fn with(mut self, pid: Pid, ppid: Pid) -> Self {
        let mut record = RawProcess::new(pid);
        record.ppid = Some(ppid);
        self.processes.insert(pid, record);
        self
    }

    pub fn with_record(mut self, record: RawProcess) -> Self {
        self.processes.insert(record.pid, record);
        self
    }

    /// Linear chain where each pid's parent is the next one; the last pid
    /// has no parent
    pub fn chain(pids: &[Pid]) -> Self {
        let mut table = Self::new();
        for (index, &pid) in pids.iter().enumerate() {
            let ppid = pids.get(index + 1).copied().unwrap_or(0);
            table = table.with(pid, ppid);
        }
        table
    }
}

impl ProcessLookup for FakeProcessTable {
    fn lookup(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
        self.processes.get(&pid).cloned().ok_or(LookupFailure::NotFound(pid))
    }
}

/// Event source driven by the test: events are pushed synchronously into
/// the registered handler. Clones share state, so a test keeps one clone
/// and hands another to the monitor.
#[derive(Clone, Default)]
pub struct ManualEventSource {
    inner: Arc<ManualState>,
}

#[derive(Default)]
struct ManualState {
    handler: Mutex<Option<RawEventHandler>>,
    mask: Mutex<Option<EventMask>>,
    subscribes: Mutex<usize>,
    unsubscribes: Mutex<usize>,
}

impl ManualEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `raw` like a kernel subscription would: recognized kinds
    /// outside the mask never reach the handler. Returns whether the
    /// handler was called.
    pub fn emit(&self, raw: RawEvent) -> bool {
        let handler = self.inner.handler.lock().unwrap().clone();
        let mask = self.inner.mask.lock().unwrap().clone();
        match (handler, mask) {
            (Some(handler), Some(mask)) if mask.contains_code(raw.kind) || !is_known(raw.kind) => {
                handler(&raw);
                true
            }
            _ => false,
        }
    }

    pub fn subscribes(&self) -> usize {
        *self.inner.subscribes.lock().unwrap()
    }

    pub fn unsubscribes(&self) -> usize {
        *self.inner.unsubscribes.lock().unwrap()
    }
}

fn is_known(code: u32) -> bool {
    filemonitor::EventKind::from_code(code).is_some()
}

impl EventSource for ManualEventSource {
    type Subscription = ();

    fn subscribe(
        &self,
        mask: &EventMask,
        handler: RawEventHandler,
    ) -> Result<(), SubscriptionError> {
        *self.inner.handler.lock().unwrap() = Some(handler);
        *self.inner.mask.lock().unwrap() = Some(mask.clone());
        *self.inner.subscribes.lock().unwrap() += 1;
        Ok(())
    }

    fn unsubscribe(&self, _subscription: ()) -> Result<(), SubscriptionError> {
        *self.inner.handler.lock().unwrap() = None;
        *self.inner.unsubscribes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Raw event with a pid-only originator
pub fn raw_event(kind: u32, pid: Pid) -> RawEvent {
    RawEvent::new(kind, RawProcess::new(pid))
}

/// Collects delivered events for later inspection
pub fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |item: T| sink.lock().unwrap().push(item))
}
