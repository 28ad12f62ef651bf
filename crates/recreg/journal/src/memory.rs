//! In-memory journal. Deterministic and test-friendly; nothing survives the
//! process.

use chrono::{DateTime, Utc};
use recreg_types::RegistryEvent;
use std::sync::RwLock;

use crate::{EventJournal, JournalError, JournalHead, JournalRecord, JournalResult};

#[derive(Default)]
pub struct InMemoryJournal {
    records: RwLock<Vec<JournalRecord>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> JournalResult<usize> {
        let guard = self
            .records
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        Ok(guard.len())
    }

    pub fn is_empty(&self) -> JournalResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl EventJournal for InMemoryJournal {
    fn append(
        &self,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> JournalResult<JournalRecord> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| JournalError::LockPoisoned)?;
        let head = guard.last().map(JournalRecord::head);
        let record = JournalRecord::seal(head.as_ref(), event, recorded_at)?;
        guard.push(record.clone());
        Ok(record)
    }

    fn read_all(&self) -> JournalResult<Vec<JournalRecord>> {
        let guard = self
            .records
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn head(&self) -> JournalResult<Option<JournalHead>> {
        let guard = self
            .records
            .read()
            .map_err(|_| JournalError::LockPoisoned)?;
        Ok(guard.last().map(JournalRecord::head))
    }
}
