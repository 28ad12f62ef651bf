//! The combined mutable state behind the registry lock.

use recreg_capability::CapabilityStore;
use recreg_identity::IdentityRegistry;
use recreg_ledger::{RecordLedger, UploadRequest};
use recreg_replay::ReplayGuard;
use recreg_types::{RegistryError, RegistryEvent};

#[derive(Clone, Debug, Default)]
pub struct RegistryState {
    pub identities: IdentityRegistry,
    pub capabilities: CapabilityStore,
    pub replay: ReplayGuard,
    pub ledger: RecordLedger,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `event` may be applied to the current state.
    ///
    /// Registration events carry no caller; the administrator check happens
    /// before they are ever produced.
    pub fn validate(&self, event: &RegistryEvent) -> Result<(), RegistryError> {
        match event {
            RegistryEvent::ProviderRegistered { .. }
            | RegistryEvent::SubjectRegistered { .. }
            | RegistryEvent::AuditorAdded { .. } => Ok(()),
            RegistryEvent::AccessGranted { subject, .. }
            | RegistryEvent::AccessRevoked { subject, .. } => {
                CapabilityStore::authorize_mutation(&self.identities, subject)
            }
            RegistryEvent::RecordUploaded {
                provider,
                subject,
                data_hash,
                nonce,
                ..
            } => UploadRequest {
                provider: provider.clone(),
                subject: subject.clone(),
                data_hash: *data_hash,
                nonce: *nonce,
            }
            .authorize(&self.identities, &self.capabilities, &self.replay),
        }
    }

    /// Apply a validated event.
    pub fn apply(&mut self, event: &RegistryEvent) -> Result<(), RegistryError> {
        match event {
            RegistryEvent::ProviderRegistered { provider, metadata } => {
                self.identities.register_provider(provider, metadata.clone());
                self.replay.reset(provider);
            }
            RegistryEvent::SubjectRegistered { subject, metadata } => {
                self.identities.register_subject(subject, metadata.clone());
            }
            RegistryEvent::AuditorAdded { auditor } => {
                self.identities.add_auditor(auditor);
            }
            RegistryEvent::AccessGranted { subject, provider } => {
                self.capabilities.grant(subject, provider);
            }
            RegistryEvent::AccessRevoked { subject, provider } => {
                self.capabilities.revoke(subject, provider);
            }
            RegistryEvent::RecordUploaded {
                provider,
                subject,
                data_hash,
                nonce,
                timestamp,
            } => {
                let entry = UploadRequest {
                    provider: provider.clone(),
                    subject: subject.clone(),
                    data_hash: *data_hash,
                    nonce: *nonce,
                }
                .into_entry(*timestamp);
                self.ledger.commit(&mut self.replay, entry)?;
            }
        }
        Ok(())
    }
}
