pub mod core;
pub mod polling;
pub mod process_tracker;
pub mod replay;
pub mod source;

pub use self::core::{FileMonitor, StatsSnapshot};
pub use polling::PollingEventSource;
pub use replay::ReplayEventSource;
pub use source::{EventSource, RawEventHandler, SubscriptionError};
