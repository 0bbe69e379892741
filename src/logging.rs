//! Logging backend selection
//!
//! All modules log through the `log` facade. On macOS records go to the
//! Unified Logging System under the application subsystem; elsewhere they
//! go to stderr through `env_logger`, which also honours `RUST_LOG`.

use anyhow::Result;
use log::LevelFilter;

#[cfg(target_os = "macos")]
use crate::constants::APP_SUBSYSTEM;

/// Verbosity requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        // quiet wins when both are given
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// Install the global logger. Must be called at most once per process.
pub fn init_logging(verbosity: Verbosity) -> Result<()> {
    let level = verbosity.level_filter();

    #[cfg(target_os = "macos")]
    {
        oslog::OsLogger::new(APP_SUBSYSTEM)
            .level_filter(level)
            .init()
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
    }

    #[cfg(not(target_os = "macos"))]
    {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(Verbosity::Quiet.level_filter(), LevelFilter::Error);
        assert_eq!(Verbosity::Normal.level_filter(), LevelFilter::Warn);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Debug);
    }
}
