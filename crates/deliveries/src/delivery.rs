use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use agritrace_core::{CropId, DeliveryId, DomainError, DomainResult, Entity, UserId};

/// Delivery lifecycle status. Advances monotonically; never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl core::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creation input, validated into a [`Delivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelivery {
    pub crop: CropId,
    pub distributor: UserId,
    pub retailer: UserId,
    /// Vehicle, route, estimated time — free text.
    pub transport_details: String,
    pub expected_date: NaiveDate,
}

/// One batch's hand-off from a distributor to a retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    crop: CropId,
    distributor: UserId,
    retailer: UserId,
    transport_details: String,
    expected_date: NaiveDate,
    status: DeliveryStatus,
    tracking_note: Option<String>,
    created_at: DateTime<Utc>,
}

impl Delivery {
    /// Build a new delivery in `Pending` state.
    pub fn create(id: DeliveryId, input: NewDelivery, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if input.transport_details.trim().is_empty() {
            return Err(DomainError::validation("transport details cannot be empty"));
        }
        if input.distributor == input.retailer {
            return Err(DomainError::validation(
                "distributor and retailer must differ",
            ));
        }

        Ok(Self {
            id,
            crop: input.crop,
            distributor: input.distributor,
            retailer: input.retailer,
            transport_details: input.transport_details.trim().to_string(),
            expected_date: input.expected_date,
            status: DeliveryStatus::Pending,
            tracking_note: None,
            created_at,
        })
    }

    /// Rehydrate a previously validated record from a storage backend.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: DeliveryId,
        crop: CropId,
        distributor: UserId,
        retailer: UserId,
        transport_details: String,
        expected_date: NaiveDate,
        status: DeliveryStatus,
        tracking_note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            crop,
            distributor,
            retailer,
            transport_details,
            expected_date,
            status,
            tracking_note,
            created_at,
        }
    }

    pub fn id_typed(&self) -> DeliveryId {
        self.id
    }

    pub fn crop(&self) -> CropId {
        self.crop
    }

    pub fn distributor(&self) -> UserId {
        self.distributor
    }

    pub fn retailer(&self) -> UserId {
        self.retailer
    }

    pub fn transport_details(&self) -> &str {
        &self.transport_details
    }

    pub fn expected_date(&self) -> NaiveDate {
        self.expected_date
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn tracking_note(&self) -> Option<&str> {
        self.tracking_note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Distributor puts the delivery on the road: Pending → InTransit.
    ///
    /// Calling this on a delivery already in transit is an accepted no-op;
    /// a completed delivery conflicts.
    pub fn start_transport(&mut self) -> DomainResult<()> {
        match self.status {
            DeliveryStatus::Pending => {
                self.status = DeliveryStatus::InTransit;
                Ok(())
            }
            DeliveryStatus::InTransit => Ok(()),
            DeliveryStatus::Delivered => Err(DomainError::conflict(
                "delivery is already completed",
            )),
        }
    }

    /// Retailer receives the goods: InTransit → Delivered.
    pub fn mark_delivered(&mut self) -> DomainResult<()> {
        match self.status {
            DeliveryStatus::InTransit => {
                self.status = DeliveryStatus::Delivered;
                Ok(())
            }
            other => Err(DomainError::conflict(format!(
                "delivery cannot complete from '{other}'"
            ))),
        }
    }

    /// Attach/replace the free-text tracking note while underway.
    pub fn update_tracking(&mut self, note: impl Into<String>) -> DomainResult<()> {
        if self.status == DeliveryStatus::Delivered {
            return Err(DomainError::conflict(
                "completed deliveries cannot be tracked",
            ));
        }
        self.tracking_note = Some(note.into());
        Ok(())
    }
}

impl Entity for Delivery {
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_input() -> NewDelivery {
        NewDelivery {
            crop: CropId::new(),
            distributor: UserId::new(),
            retailer: UserId::new(),
            transport_details: "MH12AB1234, NH48 route, ~6h".to_string(),
            expected_date: NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
        }
    }

    fn created() -> Delivery {
        Delivery::create(DeliveryId::new(), test_input(), Utc::now()).unwrap()
    }

    #[test]
    fn create_starts_pending() {
        let delivery = created();
        assert_eq!(delivery.status(), DeliveryStatus::Pending);
        assert!(delivery.tracking_note().is_none());
    }

    #[test]
    fn create_rejects_blank_transport_details() {
        let mut input = test_input();
        input.transport_details = "  ".to_string();
        let err = Delivery::create(DeliveryId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_self_delivery() {
        let mut input = test_input();
        input.retailer = input.distributor;
        let err = Delivery::create(DeliveryId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lifecycle_advances_monotonically() {
        let mut delivery = created();
        delivery.start_transport().unwrap();
        assert_eq!(delivery.status(), DeliveryStatus::InTransit);
        delivery.mark_delivered().unwrap();
        assert_eq!(delivery.status(), DeliveryStatus::Delivered);
    }

    #[test]
    fn start_transport_twice_is_a_no_op() {
        let mut delivery = created();
        delivery.start_transport().unwrap();
        delivery.start_transport().unwrap();
        assert_eq!(delivery.status(), DeliveryStatus::InTransit);
    }

    #[test]
    fn cannot_complete_from_pending() {
        let mut delivery = created();
        let err = delivery.mark_delivered().unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(delivery.status(), DeliveryStatus::Pending);
    }

    #[test]
    fn cannot_restart_a_completed_delivery() {
        let mut delivery = created();
        delivery.start_transport().unwrap();
        delivery.mark_delivered().unwrap();
        assert!(matches!(
            delivery.start_transport(),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn tracking_notes_stop_at_completion() {
        let mut delivery = created();
        delivery.start_transport().unwrap();
        delivery.update_tracking("Current location: Pune bypass").unwrap();
        assert_eq!(
            delivery.tracking_note(),
            Some("Current location: Pune bypass")
        );

        delivery.mark_delivered().unwrap();
        assert!(matches!(
            delivery.update_tracking("late note"),
            Err(DomainError::Conflict(_))
        ));
    }
}
