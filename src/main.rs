#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use filemonitor::cli::{self, MonitorCommand};
use filemonitor::config::Configuration;
use filemonitor::monitor::{PollingEventSource, ReplayEventSource};
use filemonitor::output;
use filemonitor::{
    logging, Event, EventSource, EventTranslator, FileMonitor, ProcessLookup, SystemProcessLookup,
};

const WAIT_TICK: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let command = cli::parse_args();
    logging::init_logging(command.verbosity())?;

    let config = command.apply_to(Configuration::load(command.config_path.as_deref())?)?;
    let mask = config.mask()?;

    let lookup: Arc<dyn ProcessLookup> =
        Arc::new(SystemProcessLookup::new(config.polling.codesign));
    let translator =
        EventTranslator::new(lookup).with_max_ancestry_depth(config.monitor.max_ancestry_depth);

    // Set up interrupt handling
    let interrupted = Arc::new(AtomicBool::new(false));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&interrupted));

    match &command.replay {
        Some(path) => {
            info!("Replaying events from {}", path.display());
            let monitor = FileMonitor::new(ReplayEventSource::new(path), translator, mask);
            run(monitor, &command, &interrupted, |monitor| monitor.source().is_finished())
        }
        None => {
            let source = PollingEventSource::new(Duration::from_secs_f64(config.polling.interval));
            let monitor = FileMonitor::new(source, translator, mask);
            run(monitor, &command, &interrupted, |_| false)
        }
    }
}

/// Deliver events until interrupted or the source runs dry, then print the
/// delivery summary
fn run<S, F>(
    monitor: FileMonitor<S>,
    command: &MonitorCommand,
    interrupted: &AtomicBool,
    finished: F,
) -> Result<()>
where
    S: EventSource,
    F: Fn(&FileMonitor<S>) -> bool,
{
    let json_output = command.json_output;
    monitor
        .start(move |event: Event| {
            let rendered = if json_output {
                output::format_event_json(&event)
            } else {
                output::format_event_human(&event)
            };
            match rendered {
                Ok(text) => println!("{}", text),
                Err(e) => warn!("Failed to format event from pid {}: {:#}", event.process().pid, e),
            }
        })
        .context("Failed to start monitoring")?;

    while !interrupted.load(Ordering::Relaxed) && !finished(&monitor) {
        std::thread::sleep(WAIT_TICK);
    }

    monitor.stop().context("Failed to stop monitoring")?;
    if !command.quiet_mode {
        eprintln!("{}", output::format_summary(&monitor.stats()));
    }
    Ok(())
}
