use std::collections::HashMap;

use crate::events::RawProcess;
use crate::models::Pid;

/// Processes observed in one polling cycle, keyed by (pid, start time) so
/// that pid reuse shows up as an exit plus a new process
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    pub processes: HashMap<(Pid, u64), RawProcess>,
}

/// Differences between two consecutive snapshots
#[derive(Debug, Default)]
pub struct ProcessChanges {
    pub started: Vec<RawProcess>,
    pub exited: Vec<RawProcess>,
}

/// Manages process state tracking between polling cycles
pub struct ProcessTracker {
    current_snapshot: Option<ProcessSnapshot>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self {
            current_snapshot: None,
        }
    }

    /// Compare a new snapshot with the previous one.
    ///
    /// The first snapshot is only a baseline and reports nothing, to avoid
    /// flooding the output with everything already running.
    pub fn detect_changes(&mut self, new_snapshot: ProcessSnapshot) -> ProcessChanges {
        let changes = match &self.current_snapshot {
            None => ProcessChanges::default(),
            Some(previous) => {
                let mut started: Vec<RawProcess> = new_snapshot
                    .processes
                    .iter()
                    .filter(|(key, _)| !previous.processes.contains_key(key))
                    .map(|(_, process)| process.clone())
                    .collect();
                let mut exited: Vec<RawProcess> = previous
                    .processes
                    .iter()
                    .filter(|(key, _)| !new_snapshot.processes.contains_key(key))
                    .map(|(_, process)| process.clone())
                    .collect();
                // Parents before children
                started.sort_by_key(|process| process.pid);
                exited.sort_by_key(|process| process.pid);
                ProcessChanges { started, exited }
            }
        };

        self.current_snapshot = Some(new_snapshot);
        changes
    }
}

impl Default for ProcessTracker {
    fn default() -> Self {
        Self::new()
    }
}
