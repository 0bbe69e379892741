//! Ancestor chain resolution
//!
//! Walks parent links one lookup at a time. Any ancestor may exit while the
//! walk is in progress, so the result is a best-effort prefix of the true
//! chain: a failed lookup ends the walk and keeps what was collected.
//!
//! Ancestors go through [`ProcessLookup::lookup_ancestor`], so they only
//! carry signing data the lookup already has at hand.

use std::collections::HashSet;

use log::debug;

use crate::constants::{DEFAULT_MAX_ANCESTRY_DEPTH, NO_PARENT};
use crate::models::{Pid, Process};
use crate::process::ProcessLookup;
use crate::signing::extract_signing_info;

pub struct AncestryResolver<'a> {
    lookup: &'a dyn ProcessLookup,
    max_depth: usize,
}

impl<'a> AncestryResolver<'a> {
    pub fn new(lookup: &'a dyn ProcessLookup) -> Self {
        Self::with_max_depth(lookup, DEFAULT_MAX_ANCESTRY_DEPTH)
    }

    pub fn with_max_depth(lookup: &'a dyn ProcessLookup, max_depth: usize) -> Self {
        Self { lookup, max_depth }
    }

    /// Resolve the ancestors of `pid`, nearest parent first.
    ///
    /// `ppid` is where the walk starts; when `None` it is looked up from
    /// `pid`. Never contains `pid` itself and never exceeds the depth cap.
    pub fn resolve(&self, pid: Pid, ppid: Option<Pid>) -> Vec<Process> {
        let start = match ppid {
            Some(ppid) => ppid,
            None => match self.lookup.lookup_ancestor(pid) {
                Ok(record) => record.ppid.unwrap_or(NO_PARENT),
                Err(e) => {
                    debug!("Cannot resolve parent of pid {}: {}", pid, e);
                    return Vec::new();
                }
            },
        };

        let mut ancestors = Vec::new();
        let mut visited = HashSet::from([pid]);
        let mut current = start;

        while ancestors.len() < self.max_depth {
            if current <= NO_PARENT || !visited.insert(current) {
                break;
            }

            if !self.lookup.exists(current) {
                debug!("Ancestry of pid {} truncated at {}: process gone", pid, current);
                break;
            }
            let record = match self.lookup.lookup_ancestor(current) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Ancestry of pid {} truncated at {}: {}", pid, current, e);
                    break;
                }
            };

            let signing_info = extract_signing_info(record.pid, record.signing.as_ref());
            ancestors.push(Process::ancestor(&record, signing_info));
            current = record.ppid.unwrap_or(NO_PARENT);
        }

        ancestors
    }
}
