use std::collections::HashMap;
use std::sync::RwLock;

use agritrace_core::{BatchId, CropId, DeliveryId, PaymentId, UserId};
use agritrace_crops::{Crop, CropStatus};
use agritrace_deliveries::{Delivery, DeliveryStatus};
use agritrace_payments::{Payment, Transaction};
use agritrace_users::{AccountStatus, User};

use crate::error::StoreError;
use crate::filter::{matches_query, CropFilter, DeliveryFilter, PaymentFilter, UserFilter};
use crate::traits::{CropStore, DeliveryStore, PaymentStore, TransactionStore, UserStore};

/// In-memory entity store implementing all five repository traits.
///
/// Intended for tests/dev. Unique keys and conditional updates behave exactly
/// like the Postgres backend so orchestration code cannot tell them apart.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    users: RwLock<HashMap<UserId, User>>,
    crops: RwLock<HashMap<CropId, Crop>>,
    deliveries: RwLock<HashMap<DeliveryId, Delivery>>,
    transactions: RwLock<Vec<Transaction>>,
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

fn crop_with_status(crop: &Crop, status: CropStatus) -> Crop {
    Crop::restore(
        crop.id_typed(),
        crop.farmer(),
        crop.name().to_string(),
        crop.category().to_string(),
        crop.quantity(),
        crop.unit_price(),
        crop.harvest_date(),
        crop.batch_id().clone(),
        status,
        crop.photo_url().map(str::to_string),
        crop.created_at(),
    )
}

fn delivery_with(
    delivery: &Delivery,
    status: DeliveryStatus,
    tracking_note: Option<String>,
) -> Delivery {
    Delivery::restore(
        delivery.id_typed(),
        delivery.crop(),
        delivery.distributor(),
        delivery.retailer(),
        delivery.transport_details().to_string(),
        delivery.expected_date(),
        status,
        tracking_note,
        delivery.created_at(),
    )
}

fn user_with_status(user: &User, status: AccountStatus) -> User {
    User::restore(
        user.id_typed(),
        user.name().to_string(),
        user.email().to_string(),
        user.phone().to_string(),
        user.role(),
        user.password_hash().clone(),
        status,
        user.created_at(),
    )
}

fn capped<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

impl UserStore for InMemoryStores {
    fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email() == user.email()) {
            return Err(StoreError::Constraint(format!(
                "duplicate email: {}",
                user.email()
            )));
        }
        users.insert(user.id_typed(), user);
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email() == email).cloned())
    }

    fn update_user_status(&self, id: &UserId, status: AccountStatus) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        match users.get(id) {
            Some(user) => {
                let updated = user_with_status(user, status);
                users.insert(*id, updated);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut rows: Vec<User> = users
            .values()
            .filter(|u| filter.role.is_none_or(|r| u.role() == r))
            .filter(|u| filter.status.is_none_or(|s| u.status() == s))
            .filter(|u| {
                filter.query.as_deref().is_none_or(|q| {
                    matches_query(u.name(), q) || matches_query(u.email(), q)
                })
            })
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.created_at());
        Ok(capped(rows, filter.limit))
    }
}

impl CropStore for InMemoryStores {
    fn insert_crop(&self, crop: Crop) -> Result<(), StoreError> {
        let mut crops = self.crops.write().map_err(|_| poisoned())?;
        if crops.values().any(|c| c.batch_id() == crop.batch_id()) {
            return Err(StoreError::Constraint(format!(
                "duplicate batch id: {}",
                crop.batch_id()
            )));
        }
        crops.insert(crop.id_typed(), crop);
        Ok(())
    }

    fn get_crop(&self, id: &CropId) -> Result<Option<Crop>, StoreError> {
        let crops = self.crops.read().map_err(|_| poisoned())?;
        Ok(crops.get(id).cloned())
    }

    fn find_crop_by_batch(&self, batch_id: &BatchId) -> Result<Option<Crop>, StoreError> {
        let crops = self.crops.read().map_err(|_| poisoned())?;
        Ok(crops.values().find(|c| c.batch_id() == batch_id).cloned())
    }

    fn update_crop_status(
        &self,
        id: &CropId,
        expected: CropStatus,
        next: CropStatus,
    ) -> Result<(), StoreError> {
        let mut crops = self.crops.write().map_err(|_| poisoned())?;
        let crop = crops.get(id).ok_or_else(|| {
            StoreError::Concurrency(format!("crop {id} no longer exists"))
        })?;
        if crop.status() != expected {
            return Err(StoreError::Concurrency(format!(
                "crop {id} is '{}', expected '{expected}'",
                crop.status()
            )));
        }
        let updated = crop_with_status(crop, next);
        crops.insert(*id, updated);
        Ok(())
    }

    fn set_crop_status(&self, id: &CropId, next: CropStatus) -> Result<(), StoreError> {
        let mut crops = self.crops.write().map_err(|_| poisoned())?;
        let crop = crops.get(id).ok_or_else(|| {
            StoreError::Concurrency(format!("crop {id} no longer exists"))
        })?;
        let updated = crop_with_status(crop, next);
        crops.insert(*id, updated);
        Ok(())
    }

    fn list_crops(&self, filter: &CropFilter) -> Result<Vec<Crop>, StoreError> {
        let crops = self.crops.read().map_err(|_| poisoned())?;
        let mut rows: Vec<Crop> = crops
            .values()
            .filter(|c| filter.farmer.is_none_or(|f| c.farmer() == f))
            .filter(|c| filter.status.is_none_or(|s| c.status() == s))
            .filter(|c| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|cat| c.category().eq_ignore_ascii_case(cat))
            })
            .filter(|c| {
                filter
                    .max_unit_price
                    .is_none_or(|max| c.unit_price().amount() <= max)
            })
            .filter(|c| {
                filter.query.as_deref().is_none_or(|q| {
                    matches_query(c.name(), q) || matches_query(c.batch_id().as_str(), q)
                })
            })
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_at());
        Ok(capped(rows, filter.limit))
    }
}

impl DeliveryStore for InMemoryStores {
    fn insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().map_err(|_| poisoned())?;
        deliveries.insert(delivery.id_typed(), delivery);
        Ok(())
    }

    fn get_delivery(&self, id: &DeliveryId) -> Result<Option<Delivery>, StoreError> {
        let deliveries = self.deliveries.read().map_err(|_| poisoned())?;
        Ok(deliveries.get(id).cloned())
    }

    fn update_delivery_status(
        &self,
        id: &DeliveryId,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().map_err(|_| poisoned())?;
        let delivery = deliveries.get(id).ok_or_else(|| {
            StoreError::Concurrency(format!("delivery {id} no longer exists"))
        })?;
        if delivery.status() != expected {
            return Err(StoreError::Concurrency(format!(
                "delivery {id} is '{}', expected '{expected}'",
                delivery.status()
            )));
        }
        let note = delivery.tracking_note().map(str::to_string);
        let updated = delivery_with(delivery, next, note);
        deliveries.insert(*id, updated);
        Ok(())
    }

    fn update_delivery_tracking(&self, id: &DeliveryId, note: &str) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().map_err(|_| poisoned())?;
        let delivery = deliveries.get(id).ok_or_else(|| {
            StoreError::Concurrency(format!("delivery {id} no longer exists"))
        })?;
        let updated = delivery_with(delivery, delivery.status(), Some(note.to_string()));
        deliveries.insert(*id, updated);
        Ok(())
    }

    fn delete_delivery(&self, id: &DeliveryId) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().map_err(|_| poisoned())?;
        deliveries.remove(id);
        Ok(())
    }

    fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, StoreError> {
        let deliveries = self.deliveries.read().map_err(|_| poisoned())?;
        let mut rows: Vec<Delivery> = deliveries
            .values()
            .filter(|d| filter.distributor.is_none_or(|u| d.distributor() == u))
            .filter(|d| filter.retailer.is_none_or(|u| d.retailer() == u))
            .filter(|d| filter.crop.is_none_or(|c| d.crop() == c))
            .filter(|d| filter.status.is_none_or(|s| d.status() == s))
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.created_at());
        Ok(capped(rows, filter.limit))
    }
}

impl TransactionStore for InMemoryStores {
    fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().map_err(|_| poisoned())?;
        transactions.push(transaction);
        Ok(())
    }

    fn list_transactions_for_crop(&self, crop: &CropId) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.read().map_err(|_| poisoned())?;
        Ok(transactions
            .iter()
            .filter(|t| t.crop() == *crop)
            .cloned()
            .collect())
    }

    fn list_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.read().map_err(|_| poisoned())?;
        Ok(transactions
            .iter()
            .filter(|t| t.from() == *user || t.to() == *user)
            .cloned()
            .collect())
    }
}

impl PaymentStore for InMemoryStores {
    fn insert_payment(&self, payment: Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| poisoned())?;
        payments.insert(payment.id_typed(), payment);
        Ok(())
    }

    fn get_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().map_err(|_| poisoned())?;
        Ok(payments.get(id).cloned())
    }

    fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let payments = self.payments.read().map_err(|_| poisoned())?;
        let mut rows: Vec<Payment> = payments
            .values()
            .filter(|p| filter.payer.is_none_or(|u| p.payer() == u))
            .filter(|p| filter.payee.is_none_or(|u| p.payee() == u))
            .filter(|p| filter.crop.is_none_or(|c| p.crop() == Some(c)))
            .filter(|p| filter.status.is_none_or(|s| p.status() == s))
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at());
        Ok(capped(rows, filter.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agritrace_auth::{PasswordHash, Role};
    use agritrace_core::{BatchId, Money, Quantity};
    use agritrace_crops::NewCrop;
    use agritrace_users::NewUser;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn test_user(email: &str, role: Role) -> User {
        User::register(
            UserId::new(),
            NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                phone: "123".to_string(),
                role,
                password_hash: PasswordHash::derive("pw-pw-pw").unwrap(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn test_crop(farmer: UserId, batch: BatchId) -> Crop {
        Crop::register(
            CropId::new(),
            farmer,
            batch,
            NewCrop {
                name: "Wheat".to_string(),
                category: "Cereals".to_string(),
                quantity: Quantity::new(Decimal::from(100)).unwrap(),
                unit_price: Money::new(Decimal::from(50)).unwrap(),
                harvest_date: NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
                photo_url: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_email_is_a_constraint_violation() {
        let stores = InMemoryStores::new();
        stores
            .insert_user(test_user("dup@example.com", Role::Farmer))
            .unwrap();
        let err = stores
            .insert_user(test_user("dup@example.com", Role::Buyer))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn duplicate_batch_id_is_a_constraint_violation() {
        let stores = InMemoryStores::new();
        let farmer = UserId::new();
        let batch = BatchId::generate();
        stores.insert_crop(test_crop(farmer, batch.clone())).unwrap();
        let err = stores.insert_crop(test_crop(farmer, batch)).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn conditional_update_admits_exactly_one_writer() {
        let stores = InMemoryStores::new();
        let crop = test_crop(UserId::new(), BatchId::generate());
        let id = crop.id_typed();
        stores.insert_crop(crop).unwrap();

        // Two distributors race to accept: the second sees a stale status.
        stores
            .update_crop_status(&id, CropStatus::Available, CropStatus::InTransit)
            .unwrap();
        let err = stores
            .update_crop_status(&id, CropStatus::Available, CropStatus::InTransit)
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }

    #[test]
    fn list_crops_applies_predicate_conjunction() {
        let stores = InMemoryStores::new();
        let farmer = UserId::new();
        for _ in 0..3 {
            stores
                .insert_crop(test_crop(farmer, BatchId::generate()))
                .unwrap();
        }
        stores
            .insert_crop(test_crop(UserId::new(), BatchId::generate()))
            .unwrap();

        let mine = stores
            .list_crops(&CropFilter {
                farmer: Some(farmer),
                status: Some(CropStatus::Available),
                query: Some("whe".to_string()),
                ..CropFilter::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 3);

        let capped = stores
            .list_crops(&CropFilter {
                limit: Some(2),
                ..CropFilter::default()
            })
            .unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn user_search_matches_name_and_email_case_insensitively() {
        let stores = InMemoryStores::new();
        stores
            .insert_user(test_user("asha@farm.example", Role::Farmer))
            .unwrap();
        stores
            .insert_user(test_user("dev@dist.example", Role::Distributor))
            .unwrap();

        let by_email = stores
            .list_users(&UserFilter {
                query: Some("FARM.EX".to_string()),
                ..UserFilter::default()
            })
            .unwrap();
        assert_eq!(by_email.len(), 1);

        let by_role = stores
            .list_users(&UserFilter {
                role: Some(Role::Distributor),
                ..UserFilter::default()
            })
            .unwrap();
        assert_eq!(by_role.len(), 1);
    }
}
