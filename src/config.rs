//! Configuration management
//!
//! Handles TOML configuration parsing and validation. Every key is optional;
//! missing keys fall back to the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_MAX_ANCESTRY_DEPTH, MAX_ANCESTRY_DEPTH_LIMIT,
    DEFAULT_POLLING_INTERVAL, POLLING_INTERVAL_MAX, POLLING_INTERVAL_MIN,
};
use crate::events::{EventKind, EventMask};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown event kind '{0}'")]
    UnknownEvent(String),
    #[error("at least one event kind must be selected")]
    NoEvents,
    #[error("polling interval must be between {min} and {max} seconds, got {value}")]
    IntervalOutOfRange { value: f64, min: f64, max: f64 },
    #[error("max ancestry depth must be between 1 and {max}, got {value}")]
    DepthOutOfRange { value: usize, max: usize },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    pub monitor: MonitorSettings,
    pub polling: PollingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSettings {
    /// Event kind names to subscribe to
    pub events: Vec<String>,
    pub max_ancestry_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingSettings {
    /// Polling interval in seconds (0.1-300.0)
    pub interval: f64,
    /// Read signing descriptors with `codesign`
    pub codesign: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            events: EventKind::ALL.iter().map(|kind| kind.name().to_string()).collect(),
            max_ancestry_depth: DEFAULT_MAX_ANCESTRY_DEPTH,
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLLING_INTERVAL,
            codesign: cfg!(target_os = "macos"),
        }
    }
}

impl Configuration {
    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Configuration = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Load the file at `path`, or the default location when `path` is
    /// `None`. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config_dir>/filemonitor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mask()?;

        let interval = self.polling.interval;
        if !(POLLING_INTERVAL_MIN..=POLLING_INTERVAL_MAX).contains(&interval) {
            return Err(ConfigError::IntervalOutOfRange {
                value: interval,
                min: POLLING_INTERVAL_MIN,
                max: POLLING_INTERVAL_MAX,
            });
        }

        let depth = self.monitor.max_ancestry_depth;
        if depth == 0 || depth > MAX_ANCESTRY_DEPTH_LIMIT {
            return Err(ConfigError::DepthOutOfRange {
                value: depth,
                max: MAX_ANCESTRY_DEPTH_LIMIT,
            });
        }
        Ok(())
    }

    /// Subscription mask built from the configured event names
    pub fn mask(&self) -> Result<EventMask, ConfigError> {
        let kinds = self
            .monitor
            .events
            .iter()
            .map(|name| {
                name.parse::<EventKind>()
                    .map_err(|_| ConfigError::UnknownEvent(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if kinds.is_empty() {
            return Err(ConfigError::NoEvents);
        }
        Ok(EventMask::from_kinds(kinds))
    }
}
