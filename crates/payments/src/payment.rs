use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agritrace_core::{CropId, DomainError, DomainResult, Entity, Money, PaymentId, UserId};

/// Payment status. Set once at creation; see [`Payment::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creation input, validated into a [`Payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub amount: Money,
    pub payer: UserId,
    pub payee: UserId,
    pub crop: Option<CropId>,
    pub status: PaymentStatus,
    /// e.g. "UPI", "Bank Transfer".
    pub method: Option<String>,
    /// Reference assigned by an external payment system, if any.
    pub external_reference: Option<String>,
}

/// A monetary transfer between two users, optionally tied to a crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    amount: Money,
    payer: UserId,
    payee: UserId,
    crop: Option<CropId>,
    status: PaymentStatus,
    method: Option<String>,
    external_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl Payment {
    pub fn create(id: PaymentId, input: NewPayment, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if input.payer == input.payee {
            return Err(DomainError::validation("payer and payee must differ"));
        }

        Ok(Self {
            id,
            amount: input.amount,
            payer: input.payer,
            payee: input.payee,
            crop: input.crop,
            status: input.status,
            method: input.method,
            external_reference: input.external_reference,
            created_at,
        })
    }

    /// Rehydrate a previously validated record from a storage backend.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: PaymentId,
        amount: Money,
        payer: UserId,
        payee: UserId,
        crop: Option<CropId>,
        status: PaymentStatus,
        method: Option<String>,
        external_reference: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            payer,
            payee,
            crop,
            status,
            method,
            external_reference,
            created_at,
        }
    }

    pub fn id_typed(&self) -> PaymentId {
        self.id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn payer(&self) -> UserId {
        self.payer
    }

    pub fn payee(&self) -> UserId {
        self.payee
    }

    pub fn crop(&self) -> Option<CropId> {
        self.crop
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn external_reference(&self) -> Option<&str> {
        self.external_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Post-creation status transitions are not modeled.
    ///
    /// The schema carries `pending`/`failed`, but no gateway callback exists
    /// to move a payment out of them; this stub keeps the operation visible
    /// without inventing gateway semantics.
    pub fn transition(&mut self, _to: PaymentStatus) -> DomainResult<()> {
        Err(DomainError::invariant(
            "payment status is write-once; gateway-driven transitions are not modeled",
        ))
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn money(s: &str) -> Money {
        Money::new(s.parse::<Decimal>().unwrap()).unwrap()
    }

    fn test_input() -> NewPayment {
        NewPayment {
            amount: money("5000"),
            payer: UserId::new(),
            payee: UserId::new(),
            crop: Some(CropId::new()),
            status: PaymentStatus::Completed,
            method: Some("UPI".to_string()),
            external_reference: None,
        }
    }

    #[test]
    fn create_keeps_the_chosen_status() {
        let payment = Payment::create(PaymentId::new(), test_input(), Utc::now()).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Completed);
        assert_eq!(payment.method(), Some("UPI"));
    }

    #[test]
    fn create_rejects_self_payment() {
        let mut input = test_input();
        input.payee = input.payer;
        let err = Payment::create(PaymentId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn transition_is_stubbed_out() {
        let mut input = test_input();
        input.status = PaymentStatus::Pending;
        let mut payment = Payment::create(PaymentId::new(), input, Utc::now()).unwrap();

        let err = payment.transition(PaymentStatus::Completed).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        // The record is untouched.
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }
}
