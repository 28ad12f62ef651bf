use chrono::{DateTime, Utc};
use recreg_access::{AccessGate, ReadAuthority};
use recreg_capability::CapabilityStore;
use recreg_journal::{
    verify_chain, EventJournal, FileJournal, InMemoryJournal, JournalError, JournalRecord,
};
use recreg_ledger::UploadRequest;
use recreg_types::{
    Address, Nonce, QueryWindow, RecordEntry, RecordHash, RegistryError, RegistryEvent,
};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::admin::AdminController;
use crate::clock::{Clock, SystemClock};
use crate::config::{JournalConfig, RegistryConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::state::RegistryState;

/// The access-controlled record registry.
///
/// Every mutation runs validate, journal append, apply under one write lock,
/// so a failure at any step leaves both the state and the journal untouched.
pub struct RecordRegistry {
    admin: AdminController,
    state: RwLock<RegistryState>,
    journal: Arc<dyn EventJournal>,
    clock: Arc<dyn Clock>,
}

impl RecordRegistry {
    /// Open the registry described by `config`, replaying any existing
    /// journal.
    pub fn open(config: &RegistryConfig) -> ServiceResult<Self> {
        config.validate()?;
        let journal: Arc<dyn EventJournal> = match &config.journal {
            JournalConfig::Memory => Arc::new(InMemoryJournal::new()),
            JournalConfig::File { path } => Arc::new(FileJournal::open(path)?),
        };
        Self::with_journal(config.admin.clone(), journal, Arc::new(SystemClock))
    }

    /// Fresh registry with an in-memory journal.
    pub fn in_memory(admin: Address) -> Self {
        Self {
            admin: AdminController::new(admin),
            state: RwLock::new(RegistryState::new()),
            journal: Arc::new(InMemoryJournal::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a registry over an existing journal, rebuilding state from it.
    pub fn with_journal(
        admin: Address,
        journal: Arc<dyn EventJournal>,
        clock: Arc<dyn Clock>,
    ) -> ServiceResult<Self> {
        let records = journal.read_all()?;
        let state = rebuild(&records)?;

        info!(
            admin = %admin,
            events = records.len(),
            providers = state.identities.providers().len(),
            subjects = state.identities.subjects().len(),
            records = state.ledger.total_records(),
            "Record registry opened"
        );

        Ok(Self {
            admin: AdminController::new(admin),
            state: RwLock::new(state),
            journal,
            clock,
        })
    }

    pub fn admin(&self) -> &Address {
        self.admin.admin()
    }

    // ============ Administrator Operations ============

    /// Register (or re-register) a provider. Re-registration restarts the
    /// provider's nonce counter.
    pub fn register_provider(
        &self,
        caller: &Address,
        provider: &Address,
        metadata: impl Into<String>,
    ) -> ServiceResult<JournalRecord> {
        self.admin.authorize(caller)?;
        let mut state = self.write()?;
        self.commit(
            &mut state,
            RegistryEvent::ProviderRegistered {
                provider: provider.clone(),
                metadata: metadata.into(),
            },
        )
    }

    pub fn register_subject(
        &self,
        caller: &Address,
        subject: &Address,
        metadata: impl Into<String>,
    ) -> ServiceResult<JournalRecord> {
        self.admin.authorize(caller)?;
        let mut state = self.write()?;
        self.commit(
            &mut state,
            RegistryEvent::SubjectRegistered {
                subject: subject.clone(),
                metadata: metadata.into(),
            },
        )
    }

    pub fn add_auditor(&self, caller: &Address, auditor: &Address) -> ServiceResult<JournalRecord> {
        self.admin.authorize(caller)?;
        let mut state = self.write()?;
        self.commit(
            &mut state,
            RegistryEvent::AuditorAdded {
                auditor: auditor.clone(),
            },
        )
    }

    // ============ Subject Operations ============

    /// Grant `provider` access to the caller's records. Granting twice still
    /// records an event.
    pub fn grant(&self, caller: &Address, provider: &Address) -> ServiceResult<JournalRecord> {
        let mut state = self.write()?;
        deny_logged(CapabilityStore::authorize_mutation(&state.identities, caller))?;
        self.commit(
            &mut state,
            RegistryEvent::AccessGranted {
                subject: caller.clone(),
                provider: provider.clone(),
            },
        )
    }

    pub fn revoke(&self, caller: &Address, provider: &Address) -> ServiceResult<JournalRecord> {
        let mut state = self.write()?;
        deny_logged(CapabilityStore::authorize_mutation(&state.identities, caller))?;
        self.commit(
            &mut state,
            RegistryEvent::AccessRevoked {
                subject: caller.clone(),
                provider: provider.clone(),
            },
        )
    }

    // ============ Provider Operations ============

    /// Append `data_hash` to `subject`'s history on behalf of the calling
    /// provider.
    pub fn upload_record(
        &self,
        caller: &Address,
        subject: &Address,
        data_hash: RecordHash,
        nonce: Nonce,
    ) -> ServiceResult<RecordEntry> {
        let mut state = self.write()?;
        let request = UploadRequest {
            provider: caller.clone(),
            subject: subject.clone(),
            data_hash,
            nonce,
        };
        deny_logged(request.authorize(&state.identities, &state.capabilities, &state.replay))?;

        let timestamp = self.clock.now();
        let entry = request.into_entry(timestamp);
        self.commit_at(
            &mut state,
            RegistryEvent::RecordUploaded {
                provider: entry.provider.clone(),
                subject: entry.subject.clone(),
                data_hash: entry.data_hash,
                nonce: entry.nonce,
                timestamp,
            },
            timestamp,
        )?;
        Ok(entry)
    }

    /// The nonce the provider must submit next.
    pub fn next_expected_nonce(&self, provider: &Address) -> ServiceResult<Nonce> {
        Ok(self.read()?.replay.next_expected(provider))
    }

    // ============ Reads ============

    /// Data hashes of `subject`'s history, in append order.
    pub fn view_records(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> ServiceResult<Vec<RecordHash>> {
        let state = self.read()?;
        Ok(gate(&state).view_records(reader, subject)?)
    }

    /// Full entries of `subject`'s history, in append order.
    pub fn view_entries(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> ServiceResult<Vec<RecordEntry>> {
        let state = self.read()?;
        Ok(gate(&state).view_entries(reader, subject)?.to_vec())
    }

    pub fn view_records_page(
        &self,
        reader: &Address,
        subject: &Address,
        window: QueryWindow,
    ) -> ServiceResult<Vec<RecordHash>> {
        let state = self.read()?;
        Ok(gate(&state).view_records_page(reader, subject, window)?)
    }

    /// The tier under which `reader` may read `subject`.
    pub fn read_authority(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> ServiceResult<ReadAuthority> {
        let state = self.read()?;
        Ok(gate(&state).authorize(reader, subject)?)
    }

    pub fn is_provider(&self, address: &Address) -> ServiceResult<bool> {
        Ok(self.read()?.identities.is_provider(address))
    }

    pub fn is_subject(&self, address: &Address) -> ServiceResult<bool> {
        Ok(self.read()?.identities.is_subject(address))
    }

    pub fn is_auditor(&self, address: &Address) -> ServiceResult<bool> {
        Ok(self.read()?.identities.is_auditor(address))
    }

    pub fn is_granted(&self, subject: &Address, provider: &Address) -> ServiceResult<bool> {
        Ok(self.read()?.capabilities.is_granted(subject, provider))
    }

    /// Providers currently holding a grant from `subject`.
    pub fn grantees(&self, subject: &Address) -> ServiceResult<Vec<Address>> {
        Ok(self.read()?.capabilities.grantees(subject))
    }

    // ============ Journal ============

    /// Journal records in `window`, oldest first.
    pub fn events(&self, window: QueryWindow) -> ServiceResult<Vec<JournalRecord>> {
        Ok(self.journal.read_window(window)?)
    }

    /// Re-read and verify the whole journal. Returns the number of records.
    pub fn verify_journal(&self) -> ServiceResult<usize> {
        let _state = self.read()?;
        let records = self.journal.read_all()?;
        verify_chain(&records)?;
        debug!(records = records.len(), "Journal verified");
        Ok(records.len())
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ServiceResult<RegistryState> {
        Ok(self.read()?.clone())
    }

    fn commit(
        &self,
        state: &mut RegistryState,
        event: RegistryEvent,
    ) -> ServiceResult<JournalRecord> {
        self.commit_at(state, event, self.clock.now())
    }

    fn commit_at(
        &self,
        state: &mut RegistryState,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> ServiceResult<JournalRecord> {
        let record = self.journal.append(event, recorded_at)?;
        state.apply(&record.event)?;

        info!(
            sequence = record.sequence,
            event = record.event.name(),
            actor = record.event.actor().map(Address::as_str).unwrap_or("admin"),
            "Registry event recorded"
        );
        Ok(record)
    }

    fn read(&self) -> ServiceResult<RwLockReadGuard<'_, RegistryState>> {
        self.state.read().map_err(|_| ServiceError::LockPoisoned)
    }

    fn write(&self) -> ServiceResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state.write().map_err(|_| ServiceError::LockPoisoned)
    }
}

fn gate(state: &RegistryState) -> AccessGate<'_> {
    AccessGate::new(&state.identities, &state.capabilities, &state.ledger)
}

fn deny_logged(result: Result<(), RegistryError>) -> Result<(), RegistryError> {
    if let Err(err) = &result {
        warn!(error = %err, "Registry operation rejected");
    }
    result
}

/// Replay `records` against an empty state.
///
/// Beyond the hash chain, every caller-initiated event must still pass its
/// own checks at the point it was recorded.
fn rebuild(records: &[JournalRecord]) -> ServiceResult<RegistryState> {
    verify_chain(records)?;
    let mut state = RegistryState::new();
    for record in records {
        state
            .validate(&record.event)
            .and_then(|()| state.apply(&record.event))
            .map_err(|err| JournalError::IntegrityViolation {
                sequence: record.sequence,
                reason: format!("{} does not replay: {err}", record.event.name()),
            })?;
    }
    Ok(state)
}
