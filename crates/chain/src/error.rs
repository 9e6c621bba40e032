use thiserror::Error;

use agritrace_auth::AuthzError;
use agritrace_core::DomainError;
use agritrace_journey::JourneyError;
use agritrace_ledger::LedgerError;
use agritrace_store::StoreError;

/// Error surface of the supply-chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The acting role failed the allow-list check.
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// A domain rule rejected the operation (validation, illegal transition,
    /// ownership).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The entity store failed or rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The traceability ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Registration with an email that already has an account.
    #[error("email is already registered")]
    EmailTaken,

    /// Batch-id generation kept colliding past the retry budget.
    #[error("could not allocate a unique batch id")]
    BatchIdExhausted,

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl From<JourneyError> for ChainError {
    fn from(err: JourneyError) -> Self {
        match err {
            JourneyError::Store(e) => ChainError::Store(e),
            JourneyError::Ledger(e) => ChainError::Ledger(e),
        }
    }
}
