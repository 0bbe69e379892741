//! filemonitor - file system and process event monitoring library
//!
//! Translates raw kernel-style events into [`Event`] values carrying the
//! originating process, its ancestry chain and its code signing information,
//! and delivers them through [`FileMonitor`].

pub mod ancestry;
pub mod cli;
pub mod config;
pub mod constants;
pub mod events;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod output;
pub mod process;
pub mod signing;
pub mod translate;

pub use ancestry::AncestryResolver;
pub use events::{EventKind, EventMask, RawEvent, RawProcess};
pub use models::{Event, File, Pid, Process};
pub use monitor::{EventSource, FileMonitor, RawEventHandler, StatsSnapshot, SubscriptionError};
pub use process::{LookupFailure, ProcessLookup, SystemProcessLookup};
pub use signing::{extract_signing_info, SigningField, SigningInfo};
pub use translate::{EventTranslator, TranslateError};
