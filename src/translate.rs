//! Raw event translation
//!
//! Maps one [`RawEvent`] into a [`File`] or [`Process`], copying every field
//! out of the raw record and enriching each process snapshot with its
//! ancestor chain and signing information.

use std::sync::Arc;
use std::time::SystemTime;

use log::debug;

use crate::ancestry::AncestryResolver;
use crate::constants::{DEFAULT_MAX_ANCESTRY_DEPTH, NO_PARENT};
use crate::events::{EventCategory, EventKind, RawEvent, RawProcess};
use crate::models::{Event, File, Pid, Process};
use crate::process::ProcessLookup;
use crate::signing::extract_signing_info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("Unsupported event kind: {0}")]
    UnsupportedEventKind(u32),
    #[error("{kind} event from pid {pid} has no destination path")]
    MissingDestination { kind: EventKind, pid: Pid },
}

pub struct EventTranslator {
    lookup: Arc<dyn ProcessLookup>,
    max_ancestry_depth: usize,
}

impl EventTranslator {
    pub fn new(lookup: Arc<dyn ProcessLookup>) -> Self {
        Self {
            lookup,
            max_ancestry_depth: DEFAULT_MAX_ANCESTRY_DEPTH,
        }
    }

    pub fn with_max_ancestry_depth(mut self, depth: usize) -> Self {
        self.max_ancestry_depth = depth;
        self
    }

    pub fn translate(&self, raw: &RawEvent) -> Result<Event, TranslateError> {
        let kind = EventKind::from_code(raw.kind)
            .ok_or(TranslateError::UnsupportedEventKind(raw.kind))?;

        match kind.category() {
            EventCategory::FileSystem => self.translate_file(kind, raw).map(Event::File),
            EventCategory::Process => {
                let exit = if kind == EventKind::Exit { raw.exit_status } else { None };
                Ok(Event::Process(self.snapshot(&raw.process, kind, exit)))
            }
        }
    }

    fn translate_file(&self, kind: EventKind, raw: &RawEvent) -> Result<File, TranslateError> {
        let destination_path = if kind.is_two_path() {
            let destination =
                raw.destination_path.clone().ok_or(TranslateError::MissingDestination {
                    kind,
                    pid: raw.process.pid,
                })?;
            Some(destination)
        } else {
            None
        };

        Ok(File {
            event: kind.code(),
            source_path: raw.source_path.clone(),
            destination_path,
            process: self.snapshot(&raw.process, kind, None),
        })
    }

    /// Full process snapshot: raw fields first, gaps filled by lookup,
    /// then ancestry and signing
    fn snapshot(&self, raw: &RawProcess, kind: EventKind, exit: Option<i32>) -> Process {
        let record = self.complete(raw);
        let ppid = record.ppid.unwrap_or(NO_PARENT);

        let resolver =
            AncestryResolver::with_max_depth(self.lookup.as_ref(), self.max_ancestry_depth);
        let ancestors = resolver.resolve(record.pid, Some(ppid));
        let signing_info = extract_signing_info(record.pid, record.signing.as_ref());

        Process {
            pid: record.pid,
            ppid,
            uid: record.uid,
            event: Some(kind.code()),
            exit,
            path: record.path,
            arguments: record.arguments,
            ancestors,
            signing_info,
            timestamp: SystemTime::now(),
        }
    }

    fn complete(&self, raw: &RawProcess) -> RawProcess {
        let mut record = raw.clone();
        let is_complete = record.ppid.is_some()
            && record.uid.is_some()
            && record.path.is_some()
            && record.signing.is_some()
            && !record.arguments.is_empty();
        if is_complete {
            return record;
        }

        match self.lookup.lookup(raw.pid) {
            Ok(found) => {
                record.ppid = record.ppid.or(found.ppid);
                record.uid = record.uid.or(found.uid);
                record.path = record.path.or(found.path);
                record.signing = record.signing.or(found.signing);
                if record.arguments.is_empty() {
                    record.arguments = found.arguments;
                }
            }
            Err(e) => debug!("Using raw fields only for pid {}: {}", raw.pid, e),
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::process::LookupFailure;
    use crate::signing::RawSigningDescriptor;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Table(HashMap<Pid, RawProcess>);

    impl ProcessLookup for Table {
        fn lookup(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
            self.0.get(&pid).cloned().ok_or(LookupFailure::NotFound(pid))
        }
    }

    fn table() -> Arc<Table> {
        let shell = RawProcess {
            pid: 100,
            ppid: Some(1),
            uid: Some(501),
            path: Some(PathBuf::from("/bin/zsh")),
            arguments: vec!["-zsh".to_string()],
            signing: Some(RawSigningDescriptor {
                signing_id: Some("com.apple.zsh".to_string()),
                is_platform_binary: Some(true),
                ..Default::default()
            }),
        };
        let launchd = RawProcess {
            pid: 1,
            ppid: Some(0),
            uid: Some(0),
            path: Some(PathBuf::from("/sbin/launchd")),
            ..Default::default()
        };
        Arc::new(Table(HashMap::from([(100, shell), (1, launchd)])))
    }

    #[test]
    fn test_unsupported_kind_is_rejected() {
        let translator = EventTranslator::new(table());
        let raw = RawEvent::new(4242, RawProcess::new(100));
        assert_eq!(
            translator.translate(&raw),
            Err(TranslateError::UnsupportedEventKind(4242))
        );
    }

    #[test]
    fn test_exec_fills_gaps_from_lookup() {
        let translator = EventTranslator::new(table());
        let raw = RawEvent::new(
            ES_EVENT_TYPE_NOTIFY_EXEC,
            RawProcess {
                pid: 200,
                ppid: Some(100),
                uid: Some(501),
                path: Some(PathBuf::from("/usr/bin/curl")),
                arguments: vec!["curl".to_string(), "-s".to_string()],
                signing: None,
            },
        );

        let Event::Process(process) = translator.translate(&raw).unwrap() else {
            panic!("expected a process event");
        };
        assert_eq!(process.event, Some(ES_EVENT_TYPE_NOTIFY_EXEC));
        assert_eq!(process.exit, None);
        assert_eq!(process.arguments, vec!["curl", "-s"]);
        assert_eq!(process.ancestor_pids(), vec![100, 1]);
        let zsh_identifier = process.ancestors[0].signing_info.signature_identifier.known();
        assert_eq!(zsh_identifier.map(String::as_str), Some("com.apple.zsh"));
        // pid 200 is unknown to the table, so its own signing stays unknown
        assert!(process.signing_info.cd_hash.is_unknown());
    }

    #[test]
    fn test_exit_status_only_on_exit_events() {
        let translator = EventTranslator::new(table());
        let mut raw = RawEvent::new(ES_EVENT_TYPE_NOTIFY_EXIT, RawProcess::new(100));
        raw.exit_status = Some(256);
        let Event::Process(process) = translator.translate(&raw).unwrap() else {
            panic!("expected a process event");
        };
        assert_eq!(process.exit, Some(256));
        assert_eq!(process.path, Some(PathBuf::from("/bin/zsh")));

        raw.kind = ES_EVENT_TYPE_NOTIFY_FORK;
        let Event::Process(process) = translator.translate(&raw).unwrap() else {
            panic!("expected a process event");
        };
        assert_eq!(process.exit, None);
    }

    #[test]
    fn test_single_path_event_drops_destination() {
        let translator = EventTranslator::new(table());
        let mut raw = RawEvent::new(ES_EVENT_TYPE_NOTIFY_WRITE, RawProcess::new(100));
        raw.source_path = Some(PathBuf::from("/tmp/out.log"));
        raw.destination_path = Some(PathBuf::from("/tmp/ignored"));

        let Event::File(file) = translator.translate(&raw).unwrap() else {
            panic!("expected a file event");
        };
        assert_eq!(file.event, ES_EVENT_TYPE_NOTIFY_WRITE);
        assert_eq!(file.source_path, Some(PathBuf::from("/tmp/out.log")));
        assert_eq!(file.destination_path, None);
        assert_eq!(file.process.pid, 100);
        assert_eq!(file.process.ancestor_pids(), vec![1]);
    }

    #[test]
    fn test_two_path_event_without_destination_is_rejected() {
        let translator = EventTranslator::new(table());
        let mut raw = RawEvent::new(ES_EVENT_TYPE_NOTIFY_LINK, RawProcess::new(100));
        raw.source_path = Some(PathBuf::from("/a"));
        assert_eq!(
            translator.translate(&raw),
            Err(TranslateError::MissingDestination {
                kind: EventKind::Link,
                pid: 100
            })
        );
    }

    #[test]
    fn test_unknown_originator_keeps_only_pid() {
        let translator = EventTranslator::new(table());
        let mut raw = RawEvent::new(ES_EVENT_TYPE_NOTIFY_CREATE, RawProcess::new(31337));
        raw.source_path = Some(PathBuf::from("/tmp/new"));

        let Event::File(file) = translator.translate(&raw).unwrap() else {
            panic!("expected a file event");
        };
        let process = file.process;
        assert_eq!(process.pid, 31337);
        assert_eq!(process.ppid, NO_PARENT);
        assert_eq!(process.uid, None);
        assert_eq!(process.path, None);
        assert!(process.arguments.is_empty());
        assert!(process.ancestors.is_empty());
        assert_eq!(process.signing_info, crate::signing::SigningInfo::unknown());
    }

    #[test]
    fn test_missing_arguments_are_looked_up() {
        let translator = EventTranslator::new(table());
        let raw = RawEvent::new(
            ES_EVENT_TYPE_NOTIFY_FORK,
            RawProcess {
                pid: 100,
                ppid: Some(1),
                uid: Some(501),
                path: Some(PathBuf::from("/bin/zsh")),
                arguments: Vec::new(),
                signing: Some(RawSigningDescriptor::default()),
            },
        );
        let event = translator.translate(&raw).unwrap();
        assert_eq!(event.process().arguments, vec!["-zsh"]);
    }

    /// Counts full lookups, the only ones allowed to read signing data
    struct CountingTable {
        table: Arc<Table>,
        full_lookups: AtomicUsize,
    }

    impl ProcessLookup for CountingTable {
        fn lookup(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
            self.full_lookups.fetch_add(1, Ordering::SeqCst);
            self.table.lookup(pid)
        }

        fn lookup_ancestor(&self, pid: Pid) -> Result<RawProcess, LookupFailure> {
            self.table.lookup(pid).map(|record| RawProcess { signing: None, ..record })
        }
    }

    #[test]
    fn test_one_signing_read_per_event() {
        let lookup = Arc::new(CountingTable {
            table: table(),
            full_lookups: AtomicUsize::new(0),
        });
        let translator = EventTranslator::new(Arc::clone(&lookup) as Arc<dyn ProcessLookup>);
        let mut raw = RawEvent::new(
            ES_EVENT_TYPE_NOTIFY_WRITE,
            RawProcess {
                ppid: Some(100),
                ..RawProcess::new(200)
            },
        );
        raw.source_path = Some(PathBuf::from("/tmp/out.log"));

        let event = translator.translate(&raw).unwrap();
        assert_eq!(event.process().ancestor_pids(), vec![100, 1]);
        assert_eq!(lookup.full_lookups.load(Ordering::SeqCst), 1);
        assert!(event.process().ancestors[0].signing_info.signature_identifier.is_unknown());
    }

    #[test]
    fn test_ancestry_depth_is_configurable() {
        let translator = EventTranslator::new(table()).with_max_ancestry_depth(1);
        let raw = RawEvent::new(
            ES_EVENT_TYPE_NOTIFY_EXEC,
            RawProcess {
                ppid: Some(100),
                ..RawProcess::new(200)
            },
        );
        let event = translator.translate(&raw).unwrap();
        assert_eq!(event.process().ancestor_pids(), vec![100]);
    }
}
