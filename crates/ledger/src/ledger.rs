use std::sync::Arc;

use thiserror::Error;

use agritrace_core::BatchId;

use crate::event::{TraceAppend, TraceEvent};

/// Ledger operation error.
///
/// Infrastructure failures only (storage, locks). "No events for this batch"
/// is NOT an error — it is the empty sequence, the legitimate "no provenance
/// recorded yet" state.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

/// Append-only traceability ledger, keyed by batch identifier.
///
/// Semantics:
/// - `append` stamps the event with a write-time timestamp and a per-batch
///   monotonic sequence. Duplicate step types are legal (a batch can be
///   re-handled, producing several `Transport` events).
/// - `append` performs no referential check against the crop table; events
///   may precede the batch's registration.
/// - `list_by_batch` returns events ascending by `(recorded_at, sequence)`;
///   an unknown batch yields the empty vector.
pub trait TraceLedger: Send + Sync {
    fn append(&self, event: TraceAppend) -> Result<TraceEvent, LedgerError>;

    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<TraceEvent>, LedgerError>;
}

impl<L> TraceLedger for Arc<L>
where
    L: TraceLedger + ?Sized,
{
    fn append(&self, event: TraceAppend) -> Result<TraceEvent, LedgerError> {
        (**self).append(event)
    }

    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<TraceEvent>, LedgerError> {
        (**self).list_by_batch(batch_id)
    }
}
