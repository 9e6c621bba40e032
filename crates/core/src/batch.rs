//! Batch identifiers: the human-readable traceability key.
//!
//! A batch id is the one identifier that travels outside the system — printed
//! on labels, encoded into scannable codes, typed in by consumers. It is a
//! fixed prefix plus an 8-character uppercase hex suffix drawn from a UUIDv4,
//! which gives well over 2^32 combinations: collisions are negligible at the
//! record volumes involved, and the store's unique constraint is the final
//! arbiter (callers retry with a fresh id on a constraint violation).

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const BATCH_PREFIX: &str = "BATCH_";
const SUFFIX_LEN: usize = 8;

/// Globally unique, immutable batch identifier (e.g. `BATCH_3FA9C1D2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Generate a fresh batch identifier.
    ///
    /// No uniqueness check against any store happens here; insertion is where
    /// uniqueness is enforced.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{BATCH_PREFIX}{}", hex[..SUFFIX_LEN].to_uppercase()))
    }

    /// Accept an externally supplied batch identifier.
    ///
    /// Ledger events may reference batches that were never registered, so any
    /// non-blank string is accepted; only emptiness is rejected.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("BatchId: empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BatchId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_carry_prefix_and_uppercase_hex_suffix() {
        let id = BatchId::generate();
        let s = id.as_str();
        assert!(s.starts_with(BATCH_PREFIX));
        let suffix = &s[BATCH_PREFIX.len()..];
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn parse_rejects_blank_input() {
        assert!(BatchId::parse("   ").is_err());
        assert!(BatchId::parse("").is_err());
    }

    #[test]
    fn parse_accepts_foreign_identifiers() {
        // Consumers may scan codes minted elsewhere; we keep them verbatim.
        let id = BatchId::parse("LOT-2024-000123").unwrap();
        assert_eq!(id.as_str(), "LOT-2024-000123");
    }

    #[test]
    fn ten_thousand_generated_ids_are_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(BatchId::generate()), "batch id collision");
        }
    }
}
