//! Replay event source
//!
//! Delivers raw events recorded as JSON lines, one [`RawEvent`] per line, in
//! file order. Recognized kinds outside the subscription mask are skipped the
//! way a kernel subscription would never deliver them; unrecognized kinds are
//! passed through so the monitor can account for them.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::events::{EventKind, EventMask, RawEvent};
use crate::monitor::source::{join_worker, EventSource, RawEventHandler, SubscriptionError};

/// Path that means "read from standard input"
pub const STDIN_PATH: &str = "-";

pub struct ReplayEventSource {
    path: PathBuf,
    finished: Arc<AtomicBool>,
}

pub struct ReplaySubscription {
    running: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl ReplayEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether every recorded event has been handed to the handler
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        if self.path == Path::new(STDIN_PATH) {
            Ok(Box::new(BufReader::new(io::stdin())))
        } else {
            Ok(Box::new(BufReader::new(File::open(&self.path)?)))
        }
    }
}

impl EventSource for ReplayEventSource {
    type Subscription = ReplaySubscription;

    fn subscribe(
        &self,
        mask: &EventMask,
        handler: RawEventHandler,
    ) -> Result<ReplaySubscription, SubscriptionError> {
        let reader = self.open().map_err(|e| {
            SubscriptionError::Rejected(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        self.finished.store(false, Ordering::SeqCst);
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let finished = Arc::clone(&self.finished);
        let mask = mask.clone();
        let worker = std::thread::Builder::new()
            .name("filemonitor-replay".to_string())
            .spawn(move || {
                replay(reader, &mask, &handler, &worker_running);
                finished.store(true, Ordering::SeqCst);
            })
            .map_err(|e| {
                SubscriptionError::Rejected(format!("cannot spawn replay thread: {}", e))
            })?;

        Ok(ReplaySubscription { running, worker })
    }

    fn unsubscribe(&self, subscription: ReplaySubscription) -> Result<(), SubscriptionError> {
        subscription.running.store(false, Ordering::SeqCst);
        join_worker(subscription.worker)
    }
}

fn replay(
    reader: Box<dyn BufRead + Send>,
    mask: &EventMask,
    handler: &RawEventHandler,
    running: &AtomicBool,
) {
    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            debug!("Replay stopped before line {}", index + 1);
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Replay input unreadable at line {}: {}", index + 1, e);
                return;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let raw: RawEvent = match serde_json::from_str(trimmed) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed event on line {}: {}", index + 1, e);
                continue;
            }
        };
        if EventKind::from_code(raw.kind).is_some_and(|kind| !mask.contains(kind)) {
            continue;
        }
        handler(&raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn record(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn collect(source: &ReplayEventSource, mask: EventMask) -> Vec<u32> {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = source
            .subscribe(&mask, Arc::new(move |raw: &RawEvent| sink.lock().unwrap().push(raw.kind)))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !source.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        source.unsubscribe(subscription).unwrap();
        let kinds = seen.lock().unwrap().clone();
        kinds
    }

    #[test]
    fn test_replays_in_file_order() {
        let file = record(&[
            r#"{"kind": 9, "process": {"pid": 1}}"#,
            r#"{"kind": 33, "process": {"pid": 2}, "source_path": "/tmp/a"}"#,
            r#"{"kind": 15, "process": {"pid": 1}, "exit_status": 0}"#,
        ]);
        let source = ReplayEventSource::new(file.path());
        assert_eq!(collect(&source, EventMask::all()), vec![9, 33, 15]);
    }

    #[test]
    fn test_skips_comments_blank_and_malformed_lines() {
        let file = record(&[
            "# recorded on a test host",
            "",
            "not json",
            r#"{"kind": 13, "process": {"pid": 3}, "source_path": "/tmp/b"}"#,
        ]);
        let source = ReplayEventSource::new(file.path());
        assert_eq!(collect(&source, EventMask::all()), vec![13]);
    }

    #[test]
    fn test_mask_filters_recognized_kinds_only() {
        let file = record(&[
            r#"{"kind": 9, "process": {"pid": 1}}"#,
            r#"{"kind": 33, "process": {"pid": 2}}"#,
            r#"{"kind": 4242, "process": {"pid": 3}}"#,
        ]);
        let source = ReplayEventSource::new(file.path());
        let mask = EventMask::from_kinds([EventKind::Exec]);
        assert_eq!(collect(&source, mask), vec![9, 4242]);
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let source = ReplayEventSource::new("/nonexistent/events.jsonl");
        let result = source.subscribe(&EventMask::all(), Arc::new(|_: &RawEvent| {}));
        assert!(matches!(result, Err(SubscriptionError::Rejected(_))));
        assert!(!source.is_finished());
    }
}
