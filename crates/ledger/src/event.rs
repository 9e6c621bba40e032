use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agritrace_core::{BatchId, UserId};

/// Category of a lifecycle event.
///
/// The four canonical steps cover the normal farm-to-table path; the set is
/// open-ended, so any other string round-trips through [`StepType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepType {
    Harvest,
    Transport,
    Retail,
    Sale,
    Other(String),
}

impl StepType {
    pub fn as_str(&self) -> &str {
        match self {
            StepType::Harvest => "Harvest",
            StepType::Transport => "Transport",
            StepType::Retail => "Retail",
            StepType::Sale => "Sale",
            StepType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Harvest" => StepType::Harvest,
            "Transport" => StepType::Transport,
            "Retail" => StepType::Retail,
            "Sale" => StepType::Sale,
            other => StepType::Other(other.to_string()),
        }
    }
}

impl core::fmt::Display for StepType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StepType::parse(&s))
    }
}

/// Event record status.
///
/// Every event is written `Active`; no read path consults this field. It is
/// kept because the stored rows carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Archived,
}

/// An event ready to be appended (no id, sequence, or timestamp yet).
///
/// Callers never supply the timestamp: the ledger stamps events at write
/// time, which is what makes write order and timestamp order agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceAppend {
    /// Batch this event belongs to. Deliberately NOT required to reference a
    /// registered crop: "ledger precedes registration" is a legal state.
    pub batch_id: BatchId,
    pub step_type: StepType,
    pub actor: UserId,
    pub details: String,
    pub location: Option<String>,
}

/// A committed ledger event.
///
/// Immutable once written. `sequence` is assigned per batch stream,
/// monotonically, and breaks ties between events sharing a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event_id: Uuid,
    pub batch_id: BatchId,
    pub step_type: StepType,
    pub actor: UserId,
    pub details: String,
    pub location: Option<String>,
    /// Monotonically increasing position in the batch stream.
    pub sequence: u64,
    /// Assigned by the ledger at write time.
    pub recorded_at: DateTime<Utc>,
    pub status: EventStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_steps_round_trip() {
        for step in [
            StepType::Harvest,
            StepType::Transport,
            StepType::Retail,
            StepType::Sale,
        ] {
            assert_eq!(StepType::parse(step.as_str()), step);
        }
    }

    #[test]
    fn custom_steps_round_trip_through_serde() {
        let step = StepType::Other("QualityCheck".to_string());
        let json = serde_json::to_string(&step).unwrap();
        assert_eq!(json, "\"QualityCheck\"");
        let back: StepType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn canonical_step_never_parses_as_other() {
        assert_eq!(StepType::parse("Harvest"), StepType::Harvest);
        assert!(matches!(StepType::parse("harvest"), StepType::Other(_)));
    }
}
