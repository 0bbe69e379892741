//! Process lookup
//!
//! The process tree is only observable one pid at a time and may change
//! between calls, so lookups are fallible and callers treat a failure as
//! "this process is gone".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use sysinfo::{Pid as SysPid, PidExt, ProcessExt, System, SystemExt};

use crate::events::RawProcess;
use crate::models::Pid;
use crate::signing::{codesign, RawSigningDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupFailure {
    #[error("process {0} not found")]
    NotFound(Pid),
    #[error("process lookup unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a pid to its current process record
pub trait ProcessLookup: Send + Sync {
    /// Cheap liveness check
    fn exists(&self, pid: Pid) -> bool {
        self.lookup_ancestor(pid).is_ok()
    }

    fn lookup(&self, pid: Pid) -> Result<RawProcess, LookupFailure>;

    /// Record for an ancestor snapshot. Implementations where signing
    /// data is expensive only attach what is already at hand.
    fn lookup_ancestor(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
        self.lookup(pid)
    }
}

/// Signing descriptors already read, keyed by executable path. Unsigned
/// binaries and failed reads are remembered as `None`.
#[derive(Default)]
pub(crate) struct SigningCache {
    entries: Mutex<HashMap<PathBuf, Option<RawSigningDescriptor>>>,
}

impl SigningCache {
    const CAPACITY: usize = 4096;

    /// `Some(entry)` if `path` was read before
    pub(crate) fn cached(&self, path: &Path) -> Option<Option<RawSigningDescriptor>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub(crate) fn get_or_read<F>(&self, path: &Path, read: F) -> Option<RawSigningDescriptor>
    where
        F: FnOnce(&Path) -> anyhow::Result<Option<RawSigningDescriptor>>,
    {
        if let Some(entry) = self.cached(path) {
            return entry;
        }

        // Read outside the lock: codesign may take a while
        let descriptor = read(path).unwrap_or_else(|e| {
            debug!("Signing lookup failed for {}: {:#}", path.display(), e);
            None
        });

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= Self::CAPACITY {
            entries.clear();
        }
        entries.insert(path.to_path_buf(), descriptor.clone());
        descriptor
    }
}

/// Live lookup backed by `sysinfo`, with signing descriptors read through
/// `codesign` when enabled
pub struct SystemProcessLookup {
    system: Mutex<System>,
    codesign: bool,
    signing: SigningCache,
}

impl SystemProcessLookup {
    pub fn new(codesign: bool) -> Self {
        Self {
            system: Mutex::new(System::new()),
            codesign,
            signing: SigningCache::default(),
        }
    }

    fn read_record(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
        if pid <= 0 {
            return Err(LookupFailure::NotFound(pid));
        }
        let sys_pid = SysPid::from_u32(pid as u32);

        let mut system = self
            .system
            .lock()
            .map_err(|_| LookupFailure::Unavailable("process table lock poisoned".to_string()))?;
        if !system.refresh_process(sys_pid) {
            return Err(LookupFailure::NotFound(pid));
        }
        let process = system.process(sys_pid).ok_or(LookupFailure::NotFound(pid))?;
        Ok(record_from_sysinfo(pid, process))
    }
}

impl Default for SystemProcessLookup {
    fn default() -> Self {
        Self::new(cfg!(target_os = "macos"))
    }
}

impl ProcessLookup for SystemProcessLookup {
    fn exists(&self, pid: Pid) -> bool {
        if pid <= 0 {
            return false;
        }
        match kill(nix::unistd::Pid::from_raw(pid), None::<Signal>) {
            Ok(()) => true,
            // Exists, but owned by someone we may not signal
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn lookup(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
        let mut record = self.read_record(pid)?;
        if self.codesign {
            if let Some(path) = &record.path {
                record.signing = self.signing.get_or_read(path, codesign::read_signing_descriptor);
            }
        }
        Ok(record)
    }

    /// Never runs `codesign`; only binaries already read carry signing data
    fn lookup_ancestor(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
        let mut record = self.read_record(pid)?;
        if let Some(path) = &record.path {
            record.signing = self.signing.cached(path).flatten();
        }
        Ok(record)
    }
}

/// Copy the fields we track out of a `sysinfo` process entry
pub(crate) fn record_from_sysinfo(pid: Pid, process: &sysinfo::Process) -> RawProcess {
    let exe = process.exe();
    RawProcess {
        pid,
        ppid: process.parent().map(|parent| parent.as_u32() as Pid),
        uid: process.user_id().map(|uid| **uid),
        path: (!exe.as_os_str().is_empty()).then(|| PathBuf::from(exe)),
        arguments: process.cmd().to_vec(),
        signing: None,
    }
}
