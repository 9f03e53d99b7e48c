//! [`RecordId`] implementation.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for callers that need the raw UUID.
pub use ::uuid::Uuid;

/// Canonical identifier of a surveillance record.
///
/// Once constructed the wrapped UUID always renders as 32 lowercase hex characters, which is
/// the form written to the collection files and accepted from front ends.
///
/// # Construction
/// - [`RecordId::new`] allocates a fresh random identifier.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Allocates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Validates `input`, which must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not exactly 32 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{input}'"
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid record id '{input}': {e}")))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Purely syntactic canonical-form check.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RecordId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_round_trips_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = RecordId::parse(canonical).expect("canonical id should parse");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_id() {
        let err = RecordId::parse("550e8400-e29b-41d4-a716-446655440000")
            .expect_err("hyphenated form must be rejected");
        match err {
            UuidError::InvalidInput(msg) => assert!(msg.contains("32 lowercase hex characters")),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase_and_short_ids() {
        assert!(RecordId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(RecordId::parse("550e8400").is_err());
        assert!(RecordId::parse("").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let canonical = "0123456789abcdef0123456789abcdef";
        let parsed: RecordId = canonical.parse().expect("should parse");
        assert_eq!(parsed, RecordId::parse(canonical).expect("should parse"));
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").expect("canonical");
        let json = serde_json::to_string(&id).expect("serialise");
        assert_eq!(json, "\"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"");

        let back: RecordId = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, id);

        assert!(serde_json::from_str::<RecordId>("\"AAAA\"").is_err());
    }
}
