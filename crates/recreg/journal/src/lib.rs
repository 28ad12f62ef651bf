//! Record Registry Journal - the durable audit trail and source of truth.
//!
//! Every successful mutating registry call appends exactly one
//! [`JournalRecord`]. Records are sequenced from 1 and hash-linked: each
//! record's BLAKE3 hash covers its sequence, the previous record's hash, the
//! time it was recorded and the event itself. Replaying the events in order
//! rebuilds the registry after a restart.
//!
//! Backends:
//! - [`InMemoryJournal`] for tests and embedding
//! - [`FileJournal`] writing JSON Lines, synced after every append

#![deny(unsafe_code)]

mod error;
mod file;
mod memory;
mod record;

pub use error::{JournalError, JournalResult};
pub use file::FileJournal;
pub use memory::InMemoryJournal;
pub use record::{compute_record_hash, verify_chain, JournalHead, JournalRecord};

use chrono::{DateTime, Utc};
use recreg_types::{QueryWindow, RegistryEvent};

/// Append-only event storage.
pub trait EventJournal: Send + Sync {
    /// Append an event; sequencing and hashing are assigned here.
    fn append(
        &self,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> JournalResult<JournalRecord>;

    /// Every record, oldest first.
    fn read_all(&self) -> JournalResult<Vec<JournalRecord>>;

    /// Sequence and hash of the newest record.
    fn head(&self) -> JournalResult<Option<JournalHead>>;

    /// Records in `window`, oldest first.
    fn read_window(&self, window: QueryWindow) -> JournalResult<Vec<JournalRecord>> {
        Ok(window.apply(self.read_all()?))
    }
}
