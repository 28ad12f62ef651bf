//! JSON Lines journal on local disk.
//!
//! One record per line. Opening an existing file re-reads and verifies the
//! whole chain; every append is flushed and synced before it is reported as
//! successful. A failed append is cut back off the file, and an unterminated
//! final line left by a crash mid-append is dropped on the next open.

use chrono::{DateTime, Utc};
use recreg_types::RegistryEvent;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::{verify_chain, EventJournal, JournalError, JournalHead, JournalRecord, JournalResult};

pub struct FileJournal {
    path: PathBuf,
    inner: Mutex<FileState>,
}

struct FileState {
    file: File,
    head: Option<JournalHead>,
}

impl FileJournal {
    /// Open (creating if needed) the journal at `path` and verify it.
    pub fn open(path: impl AsRef<Path>) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let scan = scan(&path)?;
        if let Some(torn) = &scan.torn {
            warn!(
                path = %path.display(),
                line = torn.line,
                dropped_bytes = torn.bytes,
                reason = %torn.reason,
                "Dropping incomplete final journal line"
            );
            file.set_len(scan.valid_len)?;
            file.sync_data()?;
        } else if scan.unterminated {
            file.write_all(b"\n")?;
            file.sync_data()?;
        }

        verify_chain(&scan.records)?;
        let head = scan.records.last().map(JournalRecord::head);

        info!(
            path = %path.display(),
            records = scan.records.len(),
            "Journal opened"
        );

        Ok(Self {
            path,
            inner: Mutex::new(FileState { file, head }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventJournal for FileJournal {
    fn append(
        &self,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> JournalResult<JournalRecord> {
        let mut state = self.inner.lock().map_err(|_| JournalError::LockPoisoned)?;
        let record = JournalRecord::seal(state.head.as_ref(), event, recorded_at)?;

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        let offset = state.file.metadata()?.len();
        write_or_truncate(&mut state.file, &self.path, offset, |file| {
            file.write_all(&line)?;
            file.flush()?;
            file.sync_data()
        })?;

        state.head = Some(record.head());
        Ok(record)
    }

    fn read_all(&self) -> JournalResult<Vec<JournalRecord>> {
        // Hold the lock so a concurrent append cannot leave a half line.
        let _state = self.inner.lock().map_err(|_| JournalError::LockPoisoned)?;
        let scan = scan(&self.path)?;
        match scan.torn {
            Some(torn) => Err(JournalError::UnreadableLine {
                line: torn.line,
                reason: torn.reason,
            }),
            None => Ok(scan.records),
        }
    }

    fn head(&self) -> JournalResult<Option<JournalHead>> {
        let state = self.inner.lock().map_err(|_| JournalError::LockPoisoned)?;
        Ok(state.head.clone())
    }
}

/// Run `write` against `file`; if it fails, cut the file back to `offset` so
/// no partial line outlives the error.
fn write_or_truncate(
    file: &mut File,
    path: &Path,
    offset: u64,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let Err(err) = write(file) else {
        return Ok(());
    };
    match file.set_len(offset).and_then(|()| file.sync_data()) {
        Ok(()) => warn!(path = %path.display(), offset, error = %err, "Journal append rolled back"),
        Err(rollback) => error!(
            path = %path.display(),
            offset,
            error = %err,
            rollback_error = %rollback,
            "Journal append failed and could not be rolled back"
        ),
    }
    Err(err)
}

/// Unparseable bytes after the last newline.
struct TornLine {
    line: usize,
    bytes: usize,
    reason: String,
}

struct Scan {
    records: Vec<JournalRecord>,
    /// Length of everything before the torn line, if there is one.
    valid_len: u64,
    torn: Option<TornLine>,
    /// The last record parsed but is missing its newline.
    unterminated: bool,
}

fn scan(path: &Path) -> JournalResult<Scan> {
    let bytes = std::fs::read(path)?;
    let mut records = Vec::new();
    let mut offset = 0;
    let mut line_number = 0;
    let mut unterminated = false;

    while offset < bytes.len() {
        line_number += 1;
        let rest = &bytes[offset..];
        let (line, next, terminated) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], offset + end + 1, true),
            None => (rest, bytes.len(), false),
        };

        if !line.iter().all(u8::is_ascii_whitespace) {
            match serde_json::from_slice::<JournalRecord>(line) {
                Ok(record) => {
                    records.push(record);
                    unterminated = !terminated;
                }
                Err(e) if !terminated => {
                    return Ok(Scan {
                        records,
                        valid_len: offset as u64,
                        torn: Some(TornLine {
                            line: line_number,
                            bytes: line.len(),
                            reason: e.to_string(),
                        }),
                        unterminated: false,
                    });
                }
                Err(e) => {
                    return Err(JournalError::UnreadableLine {
                        line: line_number,
                        reason: e.to_string(),
                    });
                }
            }
        }
        offset = next;
    }

    Ok(Scan {
        records,
        valid_len: bytes.len() as u64,
        torn: None,
        unterminated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recreg_types::Address;

    fn granted(n: u32) -> RegistryEvent {
        RegistryEvent::AccessGranted {
            subject: Address::new("patient-7"),
            provider: Address::new(format!("clinic-{n}")),
        }
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        {
            let journal = FileJournal::open(&path).unwrap();
            journal.append(granted(1), Utc::now()).unwrap();
            journal.append(granted(2), Utc::now()).unwrap();
        }

        let reopened = FileJournal::open(&path).unwrap();
        let records = reopened.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].event, granted(2));
        assert_eq!(reopened.head().unwrap().map(|h| h.sequence), Some(2));

        let third = reopened.append(granted(3), Utc::now()).unwrap();
        assert_eq!(third.sequence, 3);
        assert_eq!(third.previous_hash, Some(records[1].hash.clone()));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("journal.jsonl");
        let journal = FileJournal::open(&path).unwrap();
        assert!(journal.read_all().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn tampered_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let journal = FileJournal::open(&path).unwrap();
            journal.append(granted(1), Utc::now()).unwrap();
            journal.append(granted(2), Utc::now()).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("clinic-1", "clinic-9")).unwrap();

        assert!(matches!(
            FileJournal::open(&path),
            Err(JournalError::IntegrityViolation { sequence: 1, .. })
        ));
    }

    #[test]
    fn garbage_line_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        assert!(matches!(
            FileJournal::open(&path),
            Err(JournalError::UnreadableLine { line: 1, .. })
        ));
    }

    #[test]
    fn unreadable_line_is_reported_by_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let journal = FileJournal::open(&path).unwrap();
            journal.append(granted(1), Utc::now()).unwrap();
        }

        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("\n\n{\"sequence\":2\n");
        std::fs::write(&path, contents).unwrap();

        assert!(matches!(
            FileJournal::open(&path),
            Err(JournalError::UnreadableLine { line: 4, .. })
        ));
    }

    #[test]
    fn torn_final_line_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let journal = FileJournal::open(&path).unwrap();
            journal.append(granted(1), Utc::now()).unwrap();
            journal.append(granted(2), Utc::now()).unwrap();
        }
        let intact = std::fs::metadata(&path).unwrap().len();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":3,\"recorded_at\":\"2024").unwrap();
        drop(file);

        let journal = FileJournal::open(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
        assert_eq!(journal.read_all().unwrap().len(), 2);

        let third = journal.append(granted(3), Utc::now()).unwrap();
        assert_eq!(third.sequence, 3);
        drop(journal);
        assert_eq!(FileJournal::open(&path).unwrap().read_all().unwrap().len(), 3);
    }

    #[test]
    fn complete_final_record_without_newline_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let journal = FileJournal::open(&path).unwrap();
            journal.append(granted(1), Utc::now()).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.trim_end()).unwrap();

        let journal = FileJournal::open(&path).unwrap();
        let second = journal.append(granted(2), Utc::now()).unwrap();
        assert_eq!(second.sequence, 2);
        drop(journal);
        assert_eq!(FileJournal::open(&path).unwrap().read_all().unwrap().len(), 2);
    }

    #[test]
    fn failed_write_leaves_no_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = FileJournal::open(&path).unwrap();
        journal.append(granted(1), Utc::now()).unwrap();
        let intact = std::fs::metadata(&path).unwrap().len();

        {
            let mut state = journal.inner.lock().unwrap();
            let result = write_or_truncate(&mut state.file, &path, intact, |file| {
                file.write_all(b"{\"sequence\":2,")?;
                Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
            });
            assert!(result.is_err());
        }

        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
        let second = journal.append(granted(2), Utc::now()).unwrap();
        assert_eq!(second.sequence, 2);
        drop(journal);
        assert_eq!(FileJournal::open(&path).unwrap().read_all().unwrap().len(), 2);
    }
}
