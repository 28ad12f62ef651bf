use serde::{Deserialize, Serialize};

use crate::{Address, Nonce, RecordHash, Timestamp};

/// Audit event emitted exactly once per successful mutating call.
///
/// Events are self-contained: replaying them in order against an empty state
/// rebuilds the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    ProviderRegistered {
        provider: Address,
        metadata: String,
    },
    SubjectRegistered {
        subject: Address,
        metadata: String,
    },
    AuditorAdded {
        auditor: Address,
    },
    AccessGranted {
        subject: Address,
        provider: Address,
    },
    AccessRevoked {
        subject: Address,
        provider: Address,
    },
    RecordUploaded {
        provider: Address,
        subject: Address,
        data_hash: RecordHash,
        nonce: Nonce,
        timestamp: Timestamp,
    },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::ProviderRegistered { .. } => "ProviderRegistered",
            RegistryEvent::SubjectRegistered { .. } => "SubjectRegistered",
            RegistryEvent::AuditorAdded { .. } => "AuditorAdded",
            RegistryEvent::AccessGranted { .. } => "AccessGranted",
            RegistryEvent::AccessRevoked { .. } => "AccessRevoked",
            RegistryEvent::RecordUploaded { .. } => "RecordUploaded",
        }
    }

    /// The principal whose call produced this event. Registration events are
    /// always administrator calls and return `None`.
    pub fn actor(&self) -> Option<&Address> {
        match self {
            RegistryEvent::ProviderRegistered { .. }
            | RegistryEvent::SubjectRegistered { .. }
            | RegistryEvent::AuditorAdded { .. } => None,
            RegistryEvent::AccessGranted { subject, .. }
            | RegistryEvent::AccessRevoked { subject, .. } => Some(subject),
            RegistryEvent::RecordUploaded { provider, .. } => Some(provider),
        }
    }
}
