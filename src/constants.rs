//! Global constants for filemonitor
//!
//! Centralized location for application-wide constants

/// Application subsystem identifier for macOS Unified Logging System
pub const APP_SUBSYSTEM: &str = "com.microsoft.sysinternals.filemonitor";

/// Endpoint Security `es_event_type_t` codes for the NOTIFY events we recognize
pub const ES_EVENT_TYPE_NOTIFY_EXEC: u32 = 9;
pub const ES_EVENT_TYPE_NOTIFY_OPEN: u32 = 10;
pub const ES_EVENT_TYPE_NOTIFY_FORK: u32 = 11;
pub const ES_EVENT_TYPE_NOTIFY_CLOSE: u32 = 12;
pub const ES_EVENT_TYPE_NOTIFY_CREATE: u32 = 13;
pub const ES_EVENT_TYPE_NOTIFY_EXIT: u32 = 15;
pub const ES_EVENT_TYPE_NOTIFY_LINK: u32 = 19;
pub const ES_EVENT_TYPE_NOTIFY_RENAME: u32 = 25;
pub const ES_EVENT_TYPE_NOTIFY_UNLINK: u32 = 32;
pub const ES_EVENT_TYPE_NOTIFY_WRITE: u32 = 33;

/// Parent identifier meaning "no further ancestor"
pub const NO_PARENT: i32 = 0;

/// Default cap on ancestor chain length
pub const DEFAULT_MAX_ANCESTRY_DEPTH: usize = 128;

/// Upper bound accepted for a configured ancestor chain length
pub const MAX_ANCESTRY_DEPTH_LIMIT: usize = 1024;

/// Polling interval bounds in seconds
pub const POLLING_INTERVAL_MIN: f64 = 0.1;
pub const POLLING_INTERVAL_MAX: f64 = 300.0;
pub const DEFAULT_POLLING_INTERVAL: f64 = 1.0;

/// Code signing keys (serialized names of the signing-info fields)
pub const KEY_SIGNATURE_CDHASH: &str = "cdHash";
pub const KEY_SIGNATURE_FLAGS: &str = "csFlags";
pub const KEY_SIGNATURE_IDENTIFIER: &str = "signatureIdentifier";
pub const KEY_SIGNATURE_TEAM_IDENTIFIER: &str = "teamIdentifier";
pub const KEY_SIGNATURE_PLATFORM_BINARY: &str = "isPlatformBinary";

/// Value reported for a signing attribute that could not be determined
pub const UNKNOWN_VALUE: &str = "unknown";

/// Config file name under the user's config directory
pub const CONFIG_DIR_NAME: &str = "filemonitor";
pub const CONFIG_FILE_NAME: &str = "config.toml";
