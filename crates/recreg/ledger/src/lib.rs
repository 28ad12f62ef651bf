//! Record Registry Ledger - the central write path.
//!
//! Every subject owns an ordered, append-only sequence of [`RecordEntry`]s.
//! Appending is split in two so a caller can persist the resulting event
//! between validation and mutation:
//!
//! 1. [`UploadRequest::authorize`] runs every precondition against current
//!    state without touching it.
//! 2. [`RecordLedger::commit`] consumes the nonce and appends the entry as one
//!    step.

#![deny(unsafe_code)]

use recreg_capability::CapabilityStore;
use recreg_identity::IdentityRegistry;
use recreg_replay::ReplayGuard;
use recreg_types::{Address, Nonce, RecordEntry, RecordHash, RegistryError, Role, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A provider's request to append one record reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub provider: Address,
    pub subject: Address,
    pub data_hash: RecordHash,
    pub nonce: Nonce,
}

impl UploadRequest {
    /// Check, in order: caller is a registered provider, subject registered,
    /// grant held, nonce is next.
    ///
    /// The first failing check is the one reported.
    pub fn authorize(
        &self,
        identities: &IdentityRegistry,
        capabilities: &CapabilityStore,
        replay: &ReplayGuard,
    ) -> Result<(), RegistryError> {
        if !identities.is_provider(&self.provider) {
            return Err(RegistryError::unauthorized(&self.provider, Role::Provider));
        }
        if !identities.is_subject(&self.subject) {
            return Err(RegistryError::NotRegisteredSubject(self.subject.clone()));
        }
        if !capabilities.is_granted(&self.subject, &self.provider) {
            return Err(RegistryError::access_denied(&self.provider, &self.subject));
        }
        replay.check(&self.provider, self.nonce)
    }

    pub fn into_entry(self, timestamp: Timestamp) -> RecordEntry {
        RecordEntry {
            provider: self.provider,
            subject: self.subject,
            data_hash: self.data_hash,
            nonce: self.nonce,
            timestamp,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordLedger {
    sequences: HashMap<Address, Vec<RecordEntry>>,
    total: usize,
}

impl RecordLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the entry's nonce and append it to the subject's history.
    ///
    /// If the nonce is rejected nothing is appended.
    pub fn commit(
        &mut self,
        replay: &mut ReplayGuard,
        entry: RecordEntry,
    ) -> Result<&RecordEntry, RegistryError> {
        replay.accept(&entry.provider, entry.nonce)?;

        debug!(
            provider = %entry.provider,
            subject = %entry.subject,
            nonce = entry.nonce,
            data_hash = %entry.data_hash,
            "Record appended"
        );

        self.total += 1;
        let sequence = self.sequences.entry(entry.subject.clone()).or_default();
        sequence.push(entry);
        Ok(&sequence[sequence.len() - 1])
    }

    /// Entries for `subject` in append order.
    pub fn records(&self, subject: &Address) -> &[RecordEntry] {
        self.sequences
            .get(subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, subject: &Address) -> usize {
        self.records(subject).len()
    }

    pub fn total_records(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
