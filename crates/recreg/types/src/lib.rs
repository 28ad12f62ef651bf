//! Record Registry Types - the vocabulary shared by every registry component.
//!
//! Nothing in here carries behavior beyond formatting and parsing. The
//! registries, the ledger and the access gate all speak in these types so the
//! event journal can persist them verbatim.

#![deny(unsafe_code)]

mod error;
mod event;
mod hash;

pub use error::{RegistryError, Role};
pub use event::RegistryEvent;
pub use hash::{RecordHash, RecordHashError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strictly sequential per-provider counter value.
pub type Nonce = u64;

/// Wall-clock value attached to appended records.
pub type Timestamp = DateTime<Utc>;

/// An authenticated principal.
///
/// The registry never verifies signatures; whoever constructs an `Address`
/// for a caller is vouching for it.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One immutable entry in a subject's record history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub provider: Address,
    pub subject: Address,
    pub data_hash: RecordHash,
    pub nonce: Nonce,
    pub timestamp: Timestamp,
}

/// Offset/limit window for paged reads. A zero limit means "everything after
/// the offset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl QueryWindow {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { limit, offset }
    }

    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_serializes_as_plain_string() {
        let address = Address::new("0xabc");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0xabc\"");
        assert_eq!(address.to_string(), "0xabc");
    }

    #[test]
    fn blank_address_is_empty() {
        assert!(Address::new("  ").is_empty());
        assert!(!Address::new("subject-1").is_empty());
    }

    #[test]
    fn window_skips_then_limits() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(QueryWindow::new(1, 2).apply(items.clone()), vec![2, 3]);
        assert_eq!(QueryWindow::new(3, 0).apply(items.clone()), vec![4, 5]);
        assert!(QueryWindow::new(10, 1).apply(items).is_empty());
    }
}
