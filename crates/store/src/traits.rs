//! Repository traits for the entity tables.
//!
//! Traits are synchronous and `Send + Sync` so domain code stays free of
//! async plumbing; async backends bridge internally. Blanket `Arc`
//! implementations let services share a backend.

use std::sync::Arc;

use agritrace_core::{BatchId, CropId, DeliveryId, PaymentId, UserId};
use agritrace_crops::{Crop, CropStatus};
use agritrace_deliveries::{Delivery, DeliveryStatus};
use agritrace_payments::{Payment, Transaction};
use agritrace_users::{AccountStatus, User};

use crate::error::StoreError;
use crate::filter::{CropFilter, DeliveryFilter, PaymentFilter, UserFilter};

/// Users table. `insert` enforces the unique constraint on email.
pub trait UserStore: Send + Sync {
    fn insert_user(&self, user: User) -> Result<(), StoreError>;

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Overwrite the account status. Returns `false` when no such user exists.
    fn update_user_status(&self, id: &UserId, status: AccountStatus) -> Result<bool, StoreError>;

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
}

/// Crops table. `insert` enforces the unique constraint on batch id.
pub trait CropStore: Send + Sync {
    fn insert_crop(&self, crop: Crop) -> Result<(), StoreError>;

    fn get_crop(&self, id: &CropId) -> Result<Option<Crop>, StoreError>;

    fn find_crop_by_batch(&self, batch_id: &BatchId) -> Result<Option<Crop>, StoreError>;

    /// Conditional status update: succeeds only while the row still holds
    /// `expected`. The losing concurrent writer gets
    /// [`StoreError::Concurrency`] instead of silently clobbering.
    fn update_crop_status(
        &self,
        id: &CropId,
        expected: CropStatus,
        next: CropStatus,
    ) -> Result<(), StoreError>;

    /// Unconditional status write. Reserved for the audited farmer override;
    /// every guarded transition goes through [`Self::update_crop_status`].
    fn set_crop_status(&self, id: &CropId, next: CropStatus) -> Result<(), StoreError>;

    fn list_crops(&self, filter: &CropFilter) -> Result<Vec<Crop>, StoreError>;
}

/// Deliveries table.
pub trait DeliveryStore: Send + Sync {
    fn insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError>;

    fn get_delivery(&self, id: &DeliveryId) -> Result<Option<Delivery>, StoreError>;

    /// Conditional status update; see [`CropStore::update_crop_status`].
    fn update_delivery_status(
        &self,
        id: &DeliveryId,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<(), StoreError>;

    fn update_delivery_tracking(&self, id: &DeliveryId, note: &str) -> Result<(), StoreError>;

    /// Remove a delivery row. Exists solely so a failed multi-step operation
    /// can compensate for an insert it already performed.
    fn delete_delivery(&self, id: &DeliveryId) -> Result<(), StoreError>;

    fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, StoreError>;
}

/// Transactions table. Append-only: no update or delete exists.
pub trait TransactionStore: Send + Sync {
    fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    fn list_transactions_for_crop(&self, crop: &CropId) -> Result<Vec<Transaction>, StoreError>;

    fn list_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, StoreError>;
}

/// Payments table.
pub trait PaymentStore: Send + Sync {
    fn insert_payment(&self, payment: Payment) -> Result<(), StoreError>;

    fn get_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;

    fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError>;
}

macro_rules! forward_arc_impl {
    ($trait_:ident { $($fn_:ident(&self $(, $arg:ident : $ty:ty)*) -> $ret:ty;)+ }) => {
        impl<S> $trait_ for Arc<S>
        where
            S: $trait_ + ?Sized,
        {
            $(
                fn $fn_(&self $(, $arg: $ty)*) -> $ret {
                    (**self).$fn_($($arg),*)
                }
            )+
        }
    };
}

forward_arc_impl!(UserStore {
    insert_user(&self, user: User) -> Result<(), StoreError>;
    get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    update_user_status(&self, id: &UserId, status: AccountStatus) -> Result<bool, StoreError>;
    list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
});

forward_arc_impl!(CropStore {
    insert_crop(&self, crop: Crop) -> Result<(), StoreError>;
    get_crop(&self, id: &CropId) -> Result<Option<Crop>, StoreError>;
    find_crop_by_batch(&self, batch_id: &BatchId) -> Result<Option<Crop>, StoreError>;
    update_crop_status(&self, id: &CropId, expected: CropStatus, next: CropStatus) -> Result<(), StoreError>;
    set_crop_status(&self, id: &CropId, next: CropStatus) -> Result<(), StoreError>;
    list_crops(&self, filter: &CropFilter) -> Result<Vec<Crop>, StoreError>;
});

forward_arc_impl!(DeliveryStore {
    insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError>;
    get_delivery(&self, id: &DeliveryId) -> Result<Option<Delivery>, StoreError>;
    update_delivery_status(&self, id: &DeliveryId, expected: DeliveryStatus, next: DeliveryStatus) -> Result<(), StoreError>;
    update_delivery_tracking(&self, id: &DeliveryId, note: &str) -> Result<(), StoreError>;
    delete_delivery(&self, id: &DeliveryId) -> Result<(), StoreError>;
    list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, StoreError>;
});

forward_arc_impl!(TransactionStore {
    insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;
    list_transactions_for_crop(&self, crop: &CropId) -> Result<Vec<Transaction>, StoreError>;
    list_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, StoreError>;
});

forward_arc_impl!(PaymentStore {
    insert_payment(&self, payment: Payment) -> Result<(), StoreError>;
    get_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;
    list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError>;
});
