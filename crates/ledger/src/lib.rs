//! `agritrace-ledger` — the traceability ledger.
//!
//! An append-only sequence of lifecycle events per batch. Events are
//! immutable once written and totally ordered by `(recorded_at, sequence)`;
//! the ledger, not the caller, assigns both.

pub mod event;
pub mod in_memory;
pub mod ledger;

pub use event::{EventStatus, StepType, TraceAppend, TraceEvent};
pub use in_memory::InMemoryTraceLedger;
pub use ledger::{LedgerError, TraceLedger};
