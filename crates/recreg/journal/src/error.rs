use thiserror::Error;

pub type JournalResult<T> = Result<T, JournalError>;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("journal integrity violation at sequence {sequence}: {reason}")]
    IntegrityViolation { sequence: u64, reason: String },

    /// A line before the end of the file does not parse. Counted from 1,
    /// blank lines included.
    #[error("journal line {line} is unreadable: {reason}")]
    UnreadableLine { line: usize, reason: String },

    #[error("journal lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Serialization(err.to_string())
    }
}
