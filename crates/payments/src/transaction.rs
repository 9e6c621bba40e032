use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agritrace_core::{CropId, DomainError, DomainResult, Entity, Money, TransactionId, UserId};

/// Creation input, validated into a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub crop: CropId,
    pub from: UserId,
    pub to: UserId,
    /// Free-form tag: "procurement", "sale", ...
    pub kind: String,
    pub amount: Option<Money>,
    pub transport_details: Option<String>,
}

/// A custody transfer between two users for one crop.
///
/// Transactions are facts: once written they are never mutated, so the type
/// exposes no setters at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    crop: CropId,
    from: UserId,
    to: UserId,
    kind: String,
    amount: Option<Money>,
    transport_details: Option<String>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn create(
        id: TransactionId,
        input: NewTransaction,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.kind.trim().is_empty() {
            return Err(DomainError::validation("transaction kind cannot be empty"));
        }
        if input.from == input.to {
            return Err(DomainError::validation(
                "custody cannot transfer to the same user",
            ));
        }

        Ok(Self {
            id,
            crop: input.crop,
            from: input.from,
            to: input.to,
            kind: input.kind.trim().to_string(),
            amount: input.amount,
            transport_details: input.transport_details,
            created_at,
        })
    }

    /// Rehydrate a previously validated record from a storage backend.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: TransactionId,
        crop: CropId,
        from: UserId,
        to: UserId,
        kind: String,
        amount: Option<Money>,
        transport_details: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            crop,
            from,
            to,
            kind,
            amount,
            transport_details,
            created_at,
        }
    }

    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    pub fn crop(&self) -> CropId {
        self.crop
    }

    pub fn from(&self) -> UserId {
        self.from
    }

    pub fn to(&self) -> UserId {
        self.to
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn amount(&self) -> Option<Money> {
        self.amount
    }

    pub fn transport_details(&self) -> Option<&str> {
        self.transport_details.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
