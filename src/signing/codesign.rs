//! Signing descriptors for on-disk binaries via `codesign`
//!
//! `codesign -dvvv` writes its report to stderr, one `Key=value` per line:
//!
//! ```text
//! Identifier=com.apple.ls
//! CodeDirectory v=20400 size=557 flags=0x0(none) hashes=12+2 location=embedded
//! Platform identifier=15
//! CDHash=2a5dd0a1b7d9c1e7a5c2d62b1ab30e2d1f0b4c3a
//! TeamIdentifier=not set
//! ```

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

use super::RawSigningDescriptor;

lazy_static! {
    static ref CODE_DIRECTORY_FLAGS: Regex =
        Regex::new(r"^CodeDirectory\b.*\bflags=0x([0-9a-fA-F]+)").expect("valid flags pattern");
}

/// Read the signing descriptor of a binary.
///
/// Returns `Ok(None)` for unsigned binaries or when codesign reports nothing
/// usable; an error only if the tool itself cannot be run.
pub fn read_signing_descriptor(binary_path: &Path) -> Result<Option<RawSigningDescriptor>> {
    let output = Command::new("codesign")
        .arg("-d")
        .arg("-vvv")
        .arg(binary_path)
        .output()
        .with_context(|| format!("Failed to run codesign for {}", binary_path.display()))?;

    if !output.status.success() {
        // Not signed, or not a code object at all
        return Ok(None);
    }

    Ok(parse_codesign_output(&String::from_utf8_lossy(&output.stderr)))
}

/// Parse the `codesign -dvvv` report into a descriptor
pub fn parse_codesign_output(report: &str) -> Option<RawSigningDescriptor> {
    let mut descriptor = RawSigningDescriptor::default();
    let mut signed = false;
    let mut platform = false;

    for line in report.lines().map(str::trim) {
        if let Some(caps) = CODE_DIRECTORY_FLAGS.captures(line) {
            descriptor.cs_flags = u32::from_str_radix(&caps[1], 16).ok();
            signed = true;
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Identifier" => {
                descriptor.signing_id = Some(value.to_string());
                signed = true;
            }
            "CDHash" => {
                descriptor.cd_hash = hex::decode(value).unwrap_or_default();
                signed = true;
            }
            "TeamIdentifier" if value != "not set" => {
                descriptor.team_id = Some(value.to_string());
            }
            "Platform identifier" => platform = true,
            _ => {}
        }
    }

    if !signed {
        return None;
    }
    descriptor.is_platform_binary = Some(platform);
    Some(descriptor)
}
