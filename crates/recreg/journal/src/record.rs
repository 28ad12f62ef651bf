use chrono::{DateTime, Utc};
use recreg_types::RegistryEvent;
use serde::{Deserialize, Serialize};

use crate::{JournalError, JournalResult};

/// One persisted, tamper-evident event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: RegistryEvent,
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl JournalRecord {
    /// Build the next record after `head`.
    pub(crate) fn seal(
        head: Option<&JournalHead>,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> JournalResult<Self> {
        let sequence = head.map(|h| h.sequence + 1).unwrap_or(1);
        let previous_hash = head.map(|h| h.hash.clone());
        let hash = compute_record_hash(sequence, previous_hash.as_deref(), recorded_at, &event)?;
        Ok(Self {
            sequence,
            recorded_at,
            event,
            previous_hash,
            hash,
        })
    }

    pub fn head(&self) -> JournalHead {
        JournalHead {
            sequence: self.sequence,
            hash: self.hash.clone(),
        }
    }
}

/// Position of the newest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalHead {
    pub sequence: u64,
    pub hash: String,
}

pub fn compute_record_hash(
    sequence: u64,
    previous_hash: Option<&str>,
    recorded_at: DateTime<Utc>,
    event: &RegistryEvent,
) -> JournalResult<String> {
    let serializable = serde_json::json!({
        "sequence": sequence,
        "previous_hash": previous_hash,
        "recorded_at": recorded_at,
        "event": event,
    });
    let serialized = serde_json::to_vec(&serializable)?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}

/// Validate sequence contiguity, previous-hash links and record hashes.
pub fn verify_chain(records: &[JournalRecord]) -> JournalResult<()> {
    let mut previous: Option<&JournalRecord> = None;
    for (index, record) in records.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if record.sequence != expected_seq {
            return Err(JournalError::IntegrityViolation {
                sequence: record.sequence,
                reason: format!("expected sequence {}, found {}", expected_seq, record.sequence),
            });
        }

        let expected_prev = previous.map(|p| p.hash.as_str());
        if record.previous_hash.as_deref() != expected_prev {
            return Err(JournalError::IntegrityViolation {
                sequence: record.sequence,
                reason: "previous hash link mismatch".into(),
            });
        }

        let computed = compute_record_hash(
            record.sequence,
            record.previous_hash.as_deref(),
            record.recorded_at,
            &record.event,
        )?;
        if computed != record.hash {
            return Err(JournalError::IntegrityViolation {
                sequence: record.sequence,
                reason: "record hash mismatch".into(),
            });
        }

        previous = Some(record);
    }
    Ok(())
}
