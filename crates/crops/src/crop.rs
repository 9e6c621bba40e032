use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use agritrace_core::{BatchId, CropId, DomainError, DomainResult, Entity, Money, Quantity, UserId};

/// Crop lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropStatus {
    Available,
    InTransit,
    Delivered,
    Sold,
}

impl CropStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropStatus::Available => "available",
            CropStatus::InTransit => "in_transit",
            CropStatus::Delivered => "delivered",
            CropStatus::Sold => "sold",
        }
    }
}

impl core::fmt::Display for CropStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration input, validated into a [`Crop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCrop {
    pub name: String,
    /// Free-form category (e.g. "Cereals", "Vegetables").
    pub category: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub harvest_date: NaiveDate,
    pub photo_url: Option<String>,
}

/// A harvested lot, identified end-to-end by its batch id.
///
/// `batch_id` is immutable once assigned; downstream actors advance `status`
/// through the guarded transitions below. The owning farmer additionally has
/// [`Crop::override_status`], a deliberate free-edit escape hatch whose use
/// the orchestration layer pairs with its own ledger append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    id: CropId,
    farmer: UserId,
    name: String,
    category: String,
    quantity: Quantity,
    unit_price: Money,
    harvest_date: NaiveDate,
    batch_id: BatchId,
    status: CropStatus,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl Crop {
    /// Validate registration input and build the batch record (`Available`).
    pub fn register(
        id: CropId,
        farmer: UserId,
        batch_id: BatchId,
        input: NewCrop,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("crop name cannot be empty"));
        }
        if input.category.trim().is_empty() {
            return Err(DomainError::validation("crop category cannot be empty"));
        }

        Ok(Self {
            id,
            farmer,
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            harvest_date: input.harvest_date,
            batch_id,
            status: CropStatus::Available,
            photo_url: input.photo_url,
            created_at,
        })
    }

    /// Rehydrate a previously validated record from a storage backend.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: CropId,
        farmer: UserId,
        name: String,
        category: String,
        quantity: Quantity,
        unit_price: Money,
        harvest_date: NaiveDate,
        batch_id: BatchId,
        status: CropStatus,
        photo_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            farmer,
            name,
            category,
            quantity,
            unit_price,
            harvest_date,
            batch_id,
            status,
            photo_url,
            created_at,
        }
    }

    pub fn id_typed(&self) -> CropId {
        self.id
    }

    pub fn farmer(&self) -> UserId {
        self.farmer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn harvest_date(&self) -> NaiveDate {
        self.harvest_date
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn status(&self) -> CropStatus {
        self.status
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a distributor may still pick this batch up.
    pub fn is_available(&self) -> bool {
        self.status == CropStatus::Available
    }

    /// Distributor accepts the batch: Available → InTransit.
    pub fn accept_for_transit(&mut self) -> DomainResult<()> {
        match self.status {
            CropStatus::Available => {
                self.status = CropStatus::InTransit;
                Ok(())
            }
            other => Err(DomainError::conflict(format!(
                "crop cannot enter transit from '{other}'"
            ))),
        }
    }

    /// Retailer receives the batch: InTransit → Delivered.
    pub fn mark_delivered(&mut self) -> DomainResult<()> {
        match self.status {
            CropStatus::InTransit => {
                self.status = CropStatus::Delivered;
                Ok(())
            }
            other => Err(DomainError::conflict(format!(
                "crop cannot be delivered from '{other}'"
            ))),
        }
    }

    /// Owning farmer's direct status edit.
    ///
    /// Legal from any state to any state — an intentional, audited exception
    /// to the guarded transitions, not a bug. Callers must append the
    /// matching ledger event; setting the same status again is still a
    /// conflict so the audit trail never records a no-op.
    pub fn override_status(&mut self, actor: UserId, new_status: CropStatus) -> DomainResult<()> {
        if actor != self.farmer {
            return Err(DomainError::forbidden(
                "only the owning farmer may override crop status",
            ));
        }
        if new_status == self.status {
            return Err(DomainError::conflict(format!(
                "crop is already '{new_status}'"
            )));
        }
        self.status = new_status;
        Ok(())
    }
}

impl Entity for Crop {
    type Id = CropId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn qty(s: &str) -> Quantity {
        Quantity::new(s.parse::<Decimal>().unwrap()).unwrap()
    }

    fn price(s: &str) -> Money {
        Money::new(s.parse::<Decimal>().unwrap()).unwrap()
    }

    fn test_input() -> NewCrop {
        NewCrop {
            name: "Wheat".to_string(),
            category: "Cereals".to_string(),
            quantity: qty("100"),
            unit_price: price("50"),
            harvest_date: NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
            photo_url: None,
        }
    }

    fn registered(farmer: UserId) -> Crop {
        Crop::register(
            CropId::new(),
            farmer,
            BatchId::generate(),
            test_input(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn register_starts_available() {
        let crop = registered(UserId::new());
        assert_eq!(crop.status(), CropStatus::Available);
        assert!(crop.is_available());
        assert!(crop.batch_id().as_str().starts_with("BATCH_"));
    }

    #[test]
    fn register_rejects_blank_name() {
        let mut input = test_input();
        input.name = " ".to_string();
        let err = Crop::register(
            CropId::new(),
            UserId::new(),
            BatchId::generate(),
            input,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn happy_path_transitions() {
        let mut crop = registered(UserId::new());
        crop.accept_for_transit().unwrap();
        assert_eq!(crop.status(), CropStatus::InTransit);
        crop.mark_delivered().unwrap();
        assert_eq!(crop.status(), CropStatus::Delivered);
    }

    #[test]
    fn transit_requires_available() {
        let mut crop = registered(UserId::new());
        crop.accept_for_transit().unwrap();
        let err = crop.accept_for_transit().unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn delivery_requires_transit() {
        let mut crop = registered(UserId::new());
        let err = crop.mark_delivered().unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn farmer_override_may_jump_states() {
        let farmer = UserId::new();
        let mut crop = registered(farmer);
        // Straight from Available to Sold — the documented exception.
        crop.override_status(farmer, CropStatus::Sold).unwrap();
        assert_eq!(crop.status(), CropStatus::Sold);
    }

    #[test]
    fn override_rejects_non_owner() {
        let mut crop = registered(UserId::new());
        let stranger = UserId::new();
        let err = crop.override_status(stranger, CropStatus::Sold).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(crop.status(), CropStatus::Available);
    }

    #[test]
    fn override_rejects_same_status() {
        let farmer = UserId::new();
        let mut crop = registered(farmer);
        let err = crop
            .override_status(farmer, CropStatus::Available)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = CropStatus> {
            prop_oneof![
                Just(CropStatus::Available),
                Just(CropStatus::InTransit),
                Just(CropStatus::Delivered),
                Just(CropStatus::Sold),
            ]
        }

        proptest! {
            /// The guarded path only ever moves forward:
            /// available → in_transit → delivered.
            #[test]
            fn guarded_transitions_never_skip_or_reverse(start in any_status()) {
                let farmer = UserId::new();
                let mut crop = registered(farmer);
                if start != CropStatus::Available {
                    crop.override_status(farmer, start).unwrap();
                }

                let transit_ok = crop.accept_for_transit().is_ok();
                prop_assert_eq!(transit_ok, start == CropStatus::Available);
                if transit_ok {
                    prop_assert_eq!(crop.status(), CropStatus::InTransit);
                }

                let delivered_ok = crop.mark_delivered().is_ok();
                prop_assert_eq!(
                    delivered_ok,
                    crop_was_in_transit(start, transit_ok)
                );
            }

            /// The farmer override reaches any distinct target from any state.
            #[test]
            fn override_reaches_any_distinct_target(
                start in any_status(),
                target in any_status(),
            ) {
                let farmer = UserId::new();
                let mut crop = registered(farmer);
                if start != CropStatus::Available {
                    crop.override_status(farmer, start).unwrap();
                }

                let result = crop.override_status(farmer, target);
                if start == target {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(crop.status(), start);
                } else {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(crop.status(), target);
                }
            }
        }

        fn crop_was_in_transit(start: CropStatus, transit_ok: bool) -> bool {
            transit_ok || start == CropStatus::InTransit
        }
    }
}
