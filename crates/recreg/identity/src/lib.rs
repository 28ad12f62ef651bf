//! Record Registry Identity - who is a provider, who is a subject, who audits.
//!
//! Registration is monotone: there is no way to unregister. Re-registering an
//! address only overwrites its metadata. Authorization of the *caller* (the
//! administrator check) happens one layer up; this registry only records
//! outcomes.

#![deny(unsafe_code)]

use recreg_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Provider and subject identities share one shape.
///
/// Presence in the registry is what registration means; `registered` is
/// always `true` on a stored identity and exists so snapshots carry the flag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub registered: bool,
    pub metadata: String,
}

impl Identity {
    fn registered(metadata: String) -> Self {
        Self {
            registered: true,
            metadata,
        }
    }
}

/// Outcome of a registration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    New,
    /// The address was already registered and its metadata was overwritten.
    Overwritten,
}

/// Registry of providers, subjects and the auditor set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdentityRegistry {
    providers: BTreeMap<Address, Identity>,
    subjects: BTreeMap<Address, Identity>,
    auditors: BTreeSet<Address>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a provider.
    pub fn register_provider(&mut self, address: &Address, metadata: impl Into<String>) -> Registration {
        let outcome = upsert(&mut self.providers, address, metadata.into());
        debug!(provider = %address, ?outcome, "Provider registered");
        outcome
    }

    /// Register (or re-register) a subject.
    pub fn register_subject(&mut self, address: &Address, metadata: impl Into<String>) -> Registration {
        let outcome = upsert(&mut self.subjects, address, metadata.into());
        debug!(subject = %address, ?outcome, "Subject registered");
        outcome
    }

    /// Add an auditor. Returns `false` when the address already audits.
    pub fn add_auditor(&mut self, address: &Address) -> bool {
        let added = self.auditors.insert(address.clone());
        debug!(auditor = %address, added, "Auditor designated");
        added
    }

    pub fn provider(&self, address: &Address) -> Option<&Identity> {
        self.providers.get(address)
    }

    pub fn subject(&self, address: &Address) -> Option<&Identity> {
        self.subjects.get(address)
    }

    pub fn is_provider(&self, address: &Address) -> bool {
        self.provider(address).is_some()
    }

    pub fn is_subject(&self, address: &Address) -> bool {
        self.subject(address).is_some()
    }

    pub fn is_auditor(&self, address: &Address) -> bool {
        self.auditors.contains(address)
    }

    /// Registered providers in address order.
    pub fn providers(&self) -> Vec<&Address> {
        self.providers.keys().collect()
    }

    /// Registered subjects in address order.
    pub fn subjects(&self) -> Vec<&Address> {
        self.subjects.keys().collect()
    }

    pub fn auditors(&self) -> Vec<&Address> {
        self.auditors.iter().collect()
    }
}

fn upsert(
    table: &mut BTreeMap<Address, Identity>,
    address: &Address,
    metadata: String,
) -> Registration {
    match table.insert(address.clone(), Identity::registered(metadata)) {
        Some(_) => Registration::Overwritten,
        None => Registration::New,
    }
}
