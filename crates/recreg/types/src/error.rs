use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Nonce};

/// Role a caller must hold for an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Provider,
    Subject,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Administrator => "the administrator",
            Role::Provider => "a registered provider",
            Role::Subject => "a registered subject",
        };
        f.write_str(name)
    }
}

/// Caller-visible rejections.
///
/// None of these is retryable as-is: the caller has to change its input (or
/// wait for someone else to change state) before resubmitting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unauthorized: {caller} is not {required}")]
    Unauthorized { caller: Address, required: Role },

    #[error("subject not registered: {0}")]
    NotRegisteredSubject(Address),

    #[error("access denied: {caller} holds no access to records of {subject}")]
    AccessDenied { caller: Address, subject: Address },

    /// Covers both a replayed nonce and a gap; `expected` is informational.
    #[error("invalid nonce for {provider}: expected {expected}, got {submitted}")]
    InvalidNonce {
        provider: Address,
        expected: Nonce,
        submitted: Nonce,
    },
}

impl RegistryError {
    pub fn unauthorized(caller: &Address, required: Role) -> Self {
        Self::Unauthorized {
            caller: caller.clone(),
            required,
        }
    }

    pub fn access_denied(caller: &Address, subject: &Address) -> Self {
        Self::AccessDenied {
            caller: caller.clone(),
            subject: subject.clone(),
        }
    }
}
