//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Event source selection (live polling or replay of a recorded file)
//! - Event kind selection
//! - Overrides for configuration file values
//! - Output format selection (human/JSON) and verbosity

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::Configuration;
use crate::events::EventKind;
use crate::logging::Verbosity;

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorCommand {
    pub config_path: Option<PathBuf>,
    /// Recorded JSON-lines events to replay instead of observing live
    pub replay: Option<PathBuf>,
    pub events: Vec<EventKind>,
    pub interval: Option<f64>,
    pub max_depth: Option<usize>,
    pub no_codesign: bool,
    pub json_output: bool,
    pub quiet_mode: bool,
    pub verbose_mode: bool,
}

impl MonitorCommand {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose_mode, self.quiet_mode)
    }

    /// Overlay command-line values onto a loaded configuration and validate
    /// the result
    pub fn apply_to(&self, mut config: Configuration) -> Result<Configuration> {
        if !self.events.is_empty() {
            config.monitor.events =
                self.events.iter().map(|kind| kind.name().to_string()).collect();
        }
        if let Some(interval) = self.interval {
            config.polling.interval = interval;
        }
        if let Some(depth) = self.max_depth {
            config.monitor.max_ancestry_depth = depth;
        }
        if self.no_codesign {
            config.polling.codesign = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn build_command() -> Command {
    Command::new("filemonitor")
        .version(env!("FILEMONITOR_VERSION"))
        .about("Monitor file system and process events with process context")
        .long_about(
            "Monitor file system and process events, enriching each one with the originating \
             process, its ancestry chain and its code signing information.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("replay")
                .short('r')
                .long("replay")
                .value_name("FILE")
                .help("Replay raw events from a JSON-lines file ('-' for stdin) instead of polling")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("event")
                .short('e')
                .long("event")
                .value_name("KIND")
                .help("Event kind to monitor, e.g. exec, exit, write, rename (repeatable)")
                .action(ArgAction::Append)
                .value_parser(|s: &str| s.parse::<EventKind>()),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Polling interval in seconds (0.1-300.0)")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum number of ancestors collected per process")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("no-codesign")
                .long("no-codesign")
                .help("Do not read code signing information from executables")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output one JSON object per event")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors and omit the summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug information")
                .action(ArgAction::SetTrue),
        )
}

/// Parse process arguments; exits on `--help`, `--version` and usage errors
pub fn parse_args() -> MonitorCommand {
    from_matches(&build_command().get_matches())
}

/// Parse an explicit argument list (first item is the program name)
pub fn try_parse_from<I, T>(args: I) -> Result<MonitorCommand, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(from_matches(&build_command().try_get_matches_from(args)?))
}

fn from_matches(matches: &ArgMatches) -> MonitorCommand {
    MonitorCommand {
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        replay: matches.get_one::<PathBuf>("replay").cloned(),
        events: matches
            .get_many::<EventKind>("event")
            .map(|values| values.copied().collect())
            .unwrap_or_default(),
        interval: matches.get_one::<f64>("interval").copied(),
        max_depth: matches.get_one::<usize>("max-depth").copied(),
        no_codesign: matches.get_flag("no-codesign"),
        json_output: matches.get_flag("json"),
        quiet_mode: matches.get_flag("quiet"),
        verbose_mode: matches.get_flag("verbose"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let command = try_parse_from(["filemonitor"]).unwrap();
        assert_eq!(command, MonitorCommand::default());
        assert_eq!(command.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_repeated_events_and_aliases() {
        let command = try_parse_from(["filemonitor", "-e", "exec", "--event", "delete"]).unwrap();
        assert_eq!(command.events, vec![EventKind::Exec, EventKind::Unlink]);
    }

    #[test]
    fn test_unknown_event_is_usage_error() {
        assert!(try_parse_from(["filemonitor", "--event", "mount"]).is_err());
    }

    #[test]
    fn test_overrides_config() {
        let args = ["filemonitor", "-e", "exit", "-i", "0.5", "--max-depth", "4", "--no-codesign"];
        let command = try_parse_from(args).unwrap();
        let config = command.apply_to(Configuration::default()).unwrap();
        assert_eq!(config.monitor.events, vec!["exit".to_string()]);
        assert_eq!(config.polling.interval, 0.5);
        assert_eq!(config.monitor.max_ancestry_depth, 4);
        assert!(!config.polling.codesign);
    }

    #[test]
    fn test_override_is_validated() {
        let command = try_parse_from(["filemonitor", "--interval", "0.01"]).unwrap();
        assert!(command.apply_to(Configuration::default()).is_err());
    }
}
