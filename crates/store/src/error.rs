use thiserror::Error;

/// Store operation error.
///
/// Infrastructure failures (storage, concurrency) as opposed to domain
/// errors. Lookups return `Option`: absence is an expected outcome ("no
/// provenance yet", "unknown batch scanned"), never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate email,
    /// duplicate batch id). No partial effect.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A conditional update found the row in an unexpected state — a
    /// concurrent writer got there first.
    #[error("concurrent update: {0}")]
    Concurrency(String),

    /// The backend could not serve the operation. Every store call is
    /// fallible; callers fail closed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}
