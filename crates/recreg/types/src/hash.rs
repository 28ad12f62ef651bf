use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content address of an off-registry record payload (32 bytes).
///
/// The registry stores only this reference, never the payload itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordHash(pub [u8; 32]);

impl RecordHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// BLAKE3 content address of a payload the caller holds locally.
    pub fn digest(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, RecordHashError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        // from_str_radix alone would let a sign through.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RecordHashError::InvalidHex);
        }
        if hex.len() != 64 {
            return Err(RecordHashError::InvalidLength(hex.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| RecordHashError::InvalidHex)?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHash({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for RecordHash {
    type Err = RecordHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for RecordHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        RecordHash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordHashError {
    #[error("invalid hex length: {0} (expected 64)")]
    InvalidLength(usize),
    #[error("invalid hex character")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parses_with_and_without_prefix() {
        let hash = RecordHash::digest(b"lab-result-2024-03");
        let hex = hash.to_hex();
        assert_eq!(RecordHash::from_hex(&hex).unwrap(), hash);
        assert_eq!(format!("0x{hex}").parse::<RecordHash>().unwrap(), hash);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            RecordHash::from_hex("abcd"),
            Err(RecordHashError::InvalidLength(4))
        );
        let bad = "zz".repeat(32);
        assert_eq!(RecordHash::from_hex(&bad), Err(RecordHashError::InvalidHex));
    }

    #[test]
    fn rejects_signed_byte_pairs() {
        let signed = "+a".repeat(32);
        assert_eq!(RecordHash::from_hex(&signed), Err(RecordHashError::InvalidHex));
        assert_eq!(
            RecordHash::from_hex(&format!("0x{}", "-0".repeat(32))),
            Err(RecordHashError::InvalidHex)
        );
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = RecordHash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: RecordHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
