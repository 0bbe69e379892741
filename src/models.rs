//! Data models module
//!
//! Defines the domain objects delivered to callers:
//! - File: one file-system mutation and the process that caused it
//! - Process: one process life-cycle event, or an ancestor snapshot
//! - Event: either of the above

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Iso8601;
use time::OffsetDateTime;

use crate::constants::NO_PARENT;
use crate::events::RawProcess;
use crate::signing::SigningInfo;

/// Process identifier (`pid_t`)
pub type Pid = i32;

/// A process event or a point-in-time ancestor snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub pid: Pid,
    /// Parent pid, `NO_PARENT` when unresolvable
    pub ppid: Pid,
    pub uid: Option<u32>,
    /// Event type code; absent on ancestor snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<u32>,
    /// Exit status, only for exit events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<i32>,
    pub path: Option<PathBuf>,
    /// Arguments in argv order
    pub arguments: Vec<String>,
    /// Nearest parent first, root last
    pub ancestors: Vec<Process>,
    pub signing_info: SigningInfo,
    /// Observation time
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: SystemTime,
}

impl Process {
    /// Reduced snapshot of an ancestor: no event, no nested ancestry
    pub fn ancestor(record: &RawProcess, signing_info: SigningInfo) -> Self {
        Self {
            pid: record.pid,
            ppid: record.ppid.unwrap_or(NO_PARENT),
            uid: record.uid,
            event: None,
            exit: None,
            path: record.path.clone(),
            arguments: record.arguments.clone(),
            ancestors: Vec::new(),
            signing_info,
            timestamp: SystemTime::now(),
        }
    }

    /// Pids of the ancestor chain, nearest first
    pub fn ancestor_pids(&self) -> Vec<Pid> {
        self.ancestors.iter().map(|ancestor| ancestor.pid).collect()
    }
}

/// A file-system event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub event: u32,
    pub source_path: Option<PathBuf>,
    /// Only set for two-path events (rename, link)
    pub destination_path: Option<PathBuf>,
    /// The process that triggered the event
    pub process: Process,
}

/// A translated event as handed to the monitor callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    File(File),
    Process(Process),
}

impl Event {
    pub fn code(&self) -> u32 {
        match self {
            Event::File(file) => file.event,
            Event::Process(process) => process.event.unwrap_or_default(),
        }
    }

    /// The process the event is about, or that caused it
    pub fn process(&self) -> &Process {
        match self {
            Event::File(file) => &file.process,
            Event::Process(process) => process,
        }
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &SystemTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*timestamp).map_err(serde::ser::Error::custom)?)
}

/// ISO 8601 rendering shared by JSON and human output
pub fn format_timestamp(timestamp: SystemTime) -> Result<String, time::error::Format> {
    OffsetDateTime::from(timestamp).format(&Iso8601::DEFAULT)
}
