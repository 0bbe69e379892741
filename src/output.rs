//! Output formatting module
//!
//! Handles:
//! - Human-readable rendering of delivered events
//! - JSON lines, one event object per line
//! - The delivered/dropped summary printed on shutdown

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::events::EventKind;
use crate::models::{format_timestamp, Event, Process};
use crate::monitor::StatsSnapshot;
use crate::signing::SigningInfo;

/// Name of an event code, falling back to the numeric code
pub fn event_name(code: u32) -> String {
    EventKind::from_code(code)
        .map(|kind| kind.name().to_string())
        .unwrap_or_else(|| format!("event#{}", code))
}

/// Format one event as a JSON object on a single line
pub fn format_event_json(event: &Event) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

/// Format one event for a terminal
pub fn format_event_human(event: &Event) -> Result<String> {
    let process = event.process();
    let timestamp = format_timestamp(process.timestamp)?;
    let mut out = format!("[{}] {}", timestamp, event_name(event.code()));

    match event {
        Event::File(file) => {
            write!(out, " {}", display_path(file.source_path.as_deref()))?;
            if let Some(destination) = &file.destination_path {
                write!(out, " -> {}", destination.display())?;
            }
            writeln!(out)?;
            write!(out, "  by {}", describe_process(process))?;
        }
        Event::Process(_) => {
            write!(out, " {}", describe_process(process))?;
            if let Some(status) = process.exit {
                write!(out, " status={}", status)?;
            }
        }
    }

    if !process.arguments.is_empty() {
        write!(out, "\n  args: {}", process.arguments.join(" "))?;
    }
    if !process.ancestors.is_empty() {
        let chain: Vec<String> = process.ancestors.iter().map(describe_process).collect();
        write!(out, "\n  ancestors: {}", chain.join(" <- "))?;
    }
    write!(out, "\n  signing: {}", describe_signing(&process.signing_info))?;
    Ok(out)
}

pub fn format_summary(stats: &StatsSnapshot) -> String {
    format!(
        "Monitor Summary:\n  Delivered: {} events\n  Dropped: {} events",
        stats.delivered, stats.dropped
    )
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".to_string())
}

fn describe_process(process: &Process) -> String {
    let mut text = format!("pid={}", process.pid);
    if let Some(uid) = process.uid {
        let _ = write!(text, " uid={}", uid);
    }
    if let Some(path) = &process.path {
        let _ = write!(text, " ({})", path.display());
    }
    text
}

fn describe_signing(info: &SigningInfo) -> String {
    info.to_map()
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
