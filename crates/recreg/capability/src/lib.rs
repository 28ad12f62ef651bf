//! Record Registry Capability - the `(subject, provider) -> bool` grant table.
//!
//! A grant authorizes one provider to append to, and read, one subject's
//! records. Grants belong to the subject: only the subject itself may flip
//! them, with no delegation and no administrator override.

#![deny(unsafe_code)]

use recreg_identity::IdentityRegistry;
use recreg_types::{Address, RegistryError, Role};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Two-key grant table, kept apart from the identity records.
#[derive(Clone, Debug, Default)]
pub struct CapabilityStore {
    grants: HashMap<(Address, Address), bool>,
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only a registered subject may mutate grants, and only its own.
    pub fn authorize_mutation(
        identities: &IdentityRegistry,
        caller: &Address,
    ) -> Result<(), RegistryError> {
        if identities.is_subject(caller) {
            Ok(())
        } else {
            Err(RegistryError::unauthorized(caller, Role::Subject))
        }
    }

    /// Set the grant. Returns `true` if it was not already held.
    pub fn grant(&mut self, subject: &Address, provider: &Address) -> bool {
        let previous = self
            .grants
            .insert((subject.clone(), provider.clone()), true)
            .unwrap_or(false);
        debug!(subject = %subject, provider = %provider, changed = !previous, "Access granted");
        !previous
    }

    /// Clear the grant. Returns `true` if it was held.
    pub fn revoke(&mut self, subject: &Address, provider: &Address) -> bool {
        let key = (subject.clone(), provider.clone());
        let previous = self.grants.get(&key).copied().unwrap_or(false);
        if previous {
            self.grants.insert(key, false);
        }
        debug!(subject = %subject, provider = %provider, changed = previous, "Access revoked");
        previous
    }

    pub fn is_granted(&self, subject: &Address, provider: &Address) -> bool {
        self.grants
            .get(&(subject.clone(), provider.clone()))
            .copied()
            .unwrap_or(false)
    }

    /// Providers currently holding a grant from `subject`, in address order.
    pub fn grantees(&self, subject: &Address) -> Vec<Address> {
        self.grants
            .iter()
            .filter(|((s, _), granted)| **granted && s == subject)
            .map(|((_, provider), _)| provider.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
