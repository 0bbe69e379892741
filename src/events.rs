//! Raw event records and event kinds
//!
//! A [`RawEvent`] is what an event source hands to the monitor. It is only
//! borrowed for the duration of the handler call, so everything the
//! translator needs is copied out of it synchronously.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::models::Pid;
use crate::signing::RawSigningDescriptor;

/// Broad classification of an event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    FileSystem,
    Process,
}

/// Event kinds the monitor knows how to translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Exec,
    Open,
    Fork,
    Close,
    Create,
    Exit,
    Link,
    Rename,
    Unlink,
    Write,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Exec,
        EventKind::Open,
        EventKind::Fork,
        EventKind::Close,
        EventKind::Create,
        EventKind::Exit,
        EventKind::Link,
        EventKind::Rename,
        EventKind::Unlink,
        EventKind::Write,
    ];

    /// Endpoint Security event type code
    pub fn code(self) -> u32 {
        match self {
            EventKind::Exec => ES_EVENT_TYPE_NOTIFY_EXEC,
            EventKind::Open => ES_EVENT_TYPE_NOTIFY_OPEN,
            EventKind::Fork => ES_EVENT_TYPE_NOTIFY_FORK,
            EventKind::Close => ES_EVENT_TYPE_NOTIFY_CLOSE,
            EventKind::Create => ES_EVENT_TYPE_NOTIFY_CREATE,
            EventKind::Exit => ES_EVENT_TYPE_NOTIFY_EXIT,
            EventKind::Link => ES_EVENT_TYPE_NOTIFY_LINK,
            EventKind::Rename => ES_EVENT_TYPE_NOTIFY_RENAME,
            EventKind::Unlink => ES_EVENT_TYPE_NOTIFY_UNLINK,
            EventKind::Write => ES_EVENT_TYPE_NOTIFY_WRITE,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Exec => "exec",
            EventKind::Open => "open",
            EventKind::Fork => "fork",
            EventKind::Close => "close",
            EventKind::Create => "create",
            EventKind::Exit => "exit",
            EventKind::Link => "link",
            EventKind::Rename => "rename",
            EventKind::Unlink => "unlink",
            EventKind::Write => "write",
        }
    }

    pub fn category(self) -> EventCategory {
        match self {
            EventKind::Exec | EventKind::Fork | EventKind::Exit => EventCategory::Process,
            _ => EventCategory::FileSystem,
        }
    }

    /// Whether the event names both a source and a destination path
    pub fn is_two_path(self) -> bool {
        matches!(self, EventKind::Rename | EventKind::Link)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "remove" | "delete" => return Ok(EventKind::Unlink),
            "hardlink" => return Ok(EventKind::Link),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Set of event kinds requested from an event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMask {
    kinds: BTreeSet<EventKind>,
}

impl EventMask {
    pub fn all() -> Self {
        Self::from_kinds(EventKind::ALL)
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Whether a raw kind code is part of this mask
    pub fn contains_code(&self, code: u32) -> bool {
        EventKind::from_code(code).is_some_and(|kind| self.contains(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Process fields carried by a raw event or returned by a process lookup.
///
/// Every field except `pid` is optional; missing values are filled from
/// [`ProcessLookup`](crate::process::ProcessLookup) when possible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProcess {
    pub pid: Pid,
    #[serde(default)]
    pub ppid: Option<Pid>,
    #[serde(default)]
    pub uid: Option<u32>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub signing: Option<RawSigningDescriptor>,
}

impl RawProcess {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            ..Default::default()
        }
    }
}

/// An unprocessed event as delivered by an event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event type code
    pub kind: u32,
    /// Time reported by the source, if any. Not used for the domain
    /// timestamp, which is the observation time.
    #[serde(default)]
    pub timestamp: Option<SystemTime>,
    /// The subject process: the originator for file events, the
    /// exec target / fork child / exiting process for process events
    pub process: RawProcess,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub destination_path: Option<PathBuf>,
    #[serde(default)]
    pub exit_status: Option<i32>,
}

impl RawEvent {
    pub fn new(kind: u32, process: RawProcess) -> Self {
        Self {
            kind,
            timestamp: None,
            process,
            source_path: None,
            destination_path: None,
            exit_status: None,
        }
    }
}
