//! Record Registry Service - the single entry point to the registry.
//!
//! [`RecordRegistry`] owns the combined state of every component behind one
//! lock and the event journal that makes it durable:
//!
//! - administrator operations: register providers and subjects, add auditors
//! - subject operations: grant and revoke provider access
//! - provider operations: upload record hashes with sequential nonces
//! - reads through the access gate, for subjects, grantees and auditors
//!
//! Opening a registry over an existing journal replays it to rebuild state.

#![deny(unsafe_code)]

mod admin;
mod clock;
mod config;
mod error;
mod registry;
mod state;

pub use crate::admin::AdminController;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{ConfigError, JournalConfig, LoggingConfig, RegistryConfig};
pub use crate::error::{ErrorKind, ServiceError, ServiceResult};
pub use crate::registry::RecordRegistry;
pub use crate::state::RegistryState;

pub use recreg_access::ReadAuthority;
pub use recreg_journal::{EventJournal, FileJournal, InMemoryJournal, JournalError, JournalRecord};
pub use recreg_types::{
    Address, Nonce, QueryWindow, RecordEntry, RecordHash, RegistryError, RegistryEvent, Role,
};
