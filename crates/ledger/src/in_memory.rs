use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use agritrace_core::BatchId;

use crate::event::{EventStatus, TraceAppend, TraceEvent};
use crate::ledger::{LedgerError, TraceLedger};

/// In-memory append-only trace ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryTraceLedger {
    streams: RwLock<HashMap<BatchId, Vec<TraceEvent>>>,
}

impl InMemoryTraceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(stream: &[TraceEvent]) -> u64 {
        stream.last().map(|e| e.sequence + 1).unwrap_or(1)
    }
}

impl TraceLedger for InMemoryTraceLedger {
    fn append(&self, event: TraceAppend) -> Result<TraceEvent, LedgerError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;

        let stream = streams.entry(event.batch_id.clone()).or_default();

        let stored = TraceEvent {
            event_id: Uuid::now_v7(),
            batch_id: event.batch_id,
            step_type: event.step_type,
            actor: event.actor,
            details: event.details,
            location: event.location,
            sequence: Self::next_sequence(stream),
            recorded_at: Utc::now(),
            status: EventStatus::Active,
        };

        stream.push(stored.clone());
        Ok(stored)
    }

    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<TraceEvent>, LedgerError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;

        let mut events = streams.get(batch_id).cloned().unwrap_or_default();
        // Streams are written in order, but sort anyway so the ordering
        // contract holds even for events restored out of order.
        events.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(events)
    }
}
