//! Record Registry Access Gate - who may read a subject's history.
//!
//! A reader is let through when it is the subject itself, when the subject
//! has granted it access, or when it belongs to the auditor set. Everyone
//! else gets `AccessDenied`. The gate only ever borrows state, so it cannot
//! mutate anything.

#![deny(unsafe_code)]

use recreg_capability::CapabilityStore;
use recreg_identity::IdentityRegistry;
use recreg_ledger::RecordLedger;
use recreg_types::{Address, QueryWindow, RecordEntry, RecordHash, RegistryError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The tier under which a read was allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadAuthority {
    Subject,
    Grantee,
    Auditor,
}

/// Borrowed view over the state the read path consults.
pub struct AccessGate<'a> {
    identities: &'a IdentityRegistry,
    capabilities: &'a CapabilityStore,
    ledger: &'a RecordLedger,
}

impl<'a> AccessGate<'a> {
    pub fn new(
        identities: &'a IdentityRegistry,
        capabilities: &'a CapabilityStore,
        ledger: &'a RecordLedger,
    ) -> Self {
        Self {
            identities,
            capabilities,
            ledger,
        }
    }

    pub fn authorize(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> Result<ReadAuthority, RegistryError> {
        let authority = if reader == subject {
            ReadAuthority::Subject
        } else if self.capabilities.is_granted(subject, reader) {
            ReadAuthority::Grantee
        } else if self.identities.is_auditor(reader) {
            ReadAuthority::Auditor
        } else {
            warn!(reader = %reader, subject = %subject, "Record read denied");
            return Err(RegistryError::access_denied(reader, subject));
        };
        debug!(reader = %reader, subject = %subject, ?authority, "Record read allowed");
        Ok(authority)
    }

    /// Full entries in append order.
    pub fn view_entries(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> Result<&'a [RecordEntry], RegistryError> {
        self.authorize(reader, subject)?;
        Ok(self.ledger.records(subject))
    }

    /// Data hashes in append order.
    pub fn view_records(
        &self,
        reader: &Address,
        subject: &Address,
    ) -> Result<Vec<RecordHash>, RegistryError> {
        Ok(self
            .view_entries(reader, subject)?
            .iter()
            .map(|entry| entry.data_hash)
            .collect())
    }

    /// Data hashes restricted to `window`, after the same authorization.
    pub fn view_records_page(
        &self,
        reader: &Address,
        subject: &Address,
        window: QueryWindow,
    ) -> Result<Vec<RecordHash>, RegistryError> {
        let entries = self.view_entries(reader, subject)?;
        Ok(window.apply(entries.iter().map(|entry| entry.data_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use recreg_ledger::UploadRequest;
    use recreg_replay::ReplayGuard;

    struct World {
        identities: IdentityRegistry,
        capabilities: CapabilityStore,
        ledger: RecordLedger,
    }

    impl World {
        fn gate(&self) -> AccessGate<'_> {
            AccessGate::new(&self.identities, &self.capabilities, &self.ledger)
        }
    }

    fn subject() -> Address {
        Address::new("patient-7")
    }

    fn provider() -> Address {
        Address::new("clinic-a")
    }

    fn world_with_records(count: u64) -> World {
        let mut identities = IdentityRegistry::new();
        identities.register_subject(&subject(), "");
        identities.register_provider(&provider(), "");
        let mut capabilities = CapabilityStore::new();
        capabilities.grant(&subject(), &provider());
        let mut replay = ReplayGuard::new();
        let mut ledger = RecordLedger::new();
        for nonce in 1..=count {
            let request = UploadRequest {
                provider: provider(),
                subject: subject(),
                data_hash: RecordHash::digest(&nonce.to_be_bytes()),
                nonce,
            };
            request.authorize(&identities, &capabilities, &replay).unwrap();
            let ts = chrono::Utc.timestamp_opt(1_700_000_000 + nonce as i64, 0).unwrap();
            ledger.commit(&mut replay, request.into_entry(ts)).unwrap();
        }
        World {
            identities,
            capabilities,
            ledger,
        }
    }

    #[test]
    fn subject_reads_own_records_without_grants() {
        let mut world = world_with_records(2);
        world.capabilities.revoke(&subject(), &provider());

        let gate = world.gate();
        assert_eq!(gate.authorize(&subject(), &subject()), Ok(ReadAuthority::Subject));
        assert_eq!(gate.view_records(&subject(), &subject()).unwrap().len(), 2);
    }

    #[test]
    fn grantee_reads_until_revoked() {
        let mut world = world_with_records(1);
        assert_eq!(
            world.gate().authorize(&provider(), &subject()),
            Ok(ReadAuthority::Grantee)
        );

        world.capabilities.revoke(&subject(), &provider());
        assert!(matches!(
            world.gate().view_records(&provider(), &subject()),
            Err(RegistryError::AccessDenied { .. })
        ));
    }

    #[test]
    fn auditor_reads_full_history() {
        let mut world = world_with_records(3);
        let auditor = Address::new("regulator");
        world.identities.add_auditor(&auditor);

        let gate = world.gate();
        assert_eq!(gate.authorize(&auditor, &subject()), Ok(ReadAuthority::Auditor));
        let entries = gate.view_entries(&auditor, &subject()).unwrap();
        let nonces: Vec<_> = entries.iter().map(|e| e.nonce).collect();
        assert_eq!(nonces, vec![1, 2, 3]);
    }

    #[test]
    fn unrelated_reader_denied() {
        let world = world_with_records(1);
        let stranger = Address::new("stranger");
        assert_eq!(
            world.gate().view_records(&stranger, &subject()),
            Err(RegistryError::access_denied(&stranger, &subject()))
        );
    }

    #[test]
    fn paging_applies_after_authorization() {
        let world = world_with_records(5);
        let gate = world.gate();

        let page = gate
            .view_records_page(&subject(), &subject(), QueryWindow::new(1, 2))
            .unwrap();
        let all = gate.view_records(&subject(), &subject()).unwrap();
        assert_eq!(page, all[1..3].to_vec());

        assert!(gate
            .view_records_page(&Address::new("stranger"), &subject(), QueryWindow::default())
            .is_err());
    }
}
