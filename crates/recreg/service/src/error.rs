use recreg_journal::JournalError;
use recreg_types::RegistryError;
use thiserror::Error;

use crate::config::ConfigError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry state lock poisoned")]
    LockPoisoned,
}

/// Payload-free classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NotRegisteredSubject,
    AccessDenied,
    InvalidNonce,
    Journal,
    Integrity,
    Config,
    LockPoisoned,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Registry(err) => match err {
                RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
                RegistryError::NotRegisteredSubject(_) => ErrorKind::NotRegisteredSubject,
                RegistryError::AccessDenied { .. } => ErrorKind::AccessDenied,
                RegistryError::InvalidNonce { .. } => ErrorKind::InvalidNonce,
            },
            ServiceError::Journal(
                JournalError::IntegrityViolation { .. } | JournalError::UnreadableLine { .. },
            ) => ErrorKind::Integrity,
            ServiceError::Journal(_) => ErrorKind::Journal,
            ServiceError::Config(_) => ErrorKind::Config,
            ServiceError::LockPoisoned => ErrorKind::LockPoisoned,
        }
    }

    /// Only a failed journal write or read may succeed on resubmission
    /// without the caller changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Journal(JournalError::Io(_)))
    }

    /// The caller-facing error, if this is one.
    pub fn as_registry(&self) -> Option<&RegistryError> {
        match self {
            ServiceError::Registry(err) => Some(err),
            _ => None,
        }
    }
}
