//! Postgres-backed entity store and trace ledger.
//!
//! Uniqueness (users.email, crops.batch_id) and conditional status updates
//! are enforced at the database level, so two processes sharing a database
//! get the same conflict semantics as two threads sharing [`crate::InMemoryStores`].
//!
//! SQLx error mapping: unique violations (`23505`) become
//! [`StoreError::Constraint`]; everything else infrastructure-shaped becomes
//! [`StoreError::Unavailable`]; undecodable rows become [`StoreError::Corrupt`].
//!
//! The repository traits are synchronous; this backend bridges via the
//! current tokio runtime handle, which works when called from within a tokio
//! context (the same arrangement the rest of the stack expects).

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use agritrace_auth::{PasswordHash, Role};
use agritrace_core::{BatchId, CropId, DeliveryId, PaymentId, TransactionId, UserId};
use agritrace_core::{Money, Quantity};
use agritrace_crops::{Crop, CropStatus};
use agritrace_deliveries::{Delivery, DeliveryStatus};
use agritrace_ledger::{EventStatus, LedgerError, StepType, TraceAppend, TraceEvent, TraceLedger};
use agritrace_payments::{Payment, PaymentStatus, Transaction};
use agritrace_users::{AccountStatus, User};

use crate::error::StoreError;
use crate::filter::{CropFilter, DeliveryFilter, PaymentFilter, UserFilter};
use crate::traits::{CropStore, DeliveryStore, PaymentStore, TransactionStore, UserStore};

/// DDL for the six tables, matching the relational layout the system has
/// always used (surrogate uuid keys, unique email and batch_id, server-side
/// `created_at`).
pub mod schema {
    pub const CREATE_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) UNIQUE NOT NULL,
        phone VARCHAR(20) NOT NULL,
        role VARCHAR(50) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE TABLE IF NOT EXISTS crops (
        id UUID PRIMARY KEY,
        farmer_id UUID REFERENCES users(id),
        name VARCHAR(255) NOT NULL,
        category VARCHAR(100) NOT NULL,
        quantity DECIMAL(10,2) NOT NULL,
        unit_price DECIMAL(10,2) NOT NULL,
        harvest_date DATE NOT NULL,
        batch_id VARCHAR(100) UNIQUE NOT NULL,
        status VARCHAR(50) NOT NULL DEFAULT 'available',
        photo_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE TABLE IF NOT EXISTS deliveries (
        id UUID PRIMARY KEY,
        crop_id UUID REFERENCES crops(id),
        distributor_id UUID REFERENCES users(id),
        retailer_id UUID REFERENCES users(id),
        transport_details TEXT NOT NULL,
        expected_date DATE NOT NULL,
        status VARCHAR(50) NOT NULL DEFAULT 'pending',
        tracking_note TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id UUID PRIMARY KEY,
        crop_id UUID REFERENCES crops(id),
        from_user_id UUID REFERENCES users(id),
        to_user_id UUID REFERENCES users(id),
        kind VARCHAR(50) NOT NULL,
        amount DECIMAL(10,2),
        transport_details TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE TABLE IF NOT EXISTS payments (
        id UUID PRIMARY KEY,
        amount DECIMAL(10,2) NOT NULL,
        from_user_id UUID REFERENCES users(id),
        to_user_id UUID REFERENCES users(id),
        crop_id UUID REFERENCES crops(id),
        status VARCHAR(50) NOT NULL DEFAULT 'pending',
        method VARCHAR(50),
        external_reference VARCHAR(100),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE TABLE IF NOT EXISTS traceability (
        event_id UUID PRIMARY KEY,
        batch_id VARCHAR(100) NOT NULL,
        step_type VARCHAR(50) NOT NULL,
        user_id UUID REFERENCES users(id),
        location VARCHAR(255),
        details TEXT NOT NULL,
        sequence BIGINT NOT NULL,
        recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        status VARCHAR(50) NOT NULL DEFAULT 'active',
        UNIQUE (batch_id, sequence)
    );
    "#;
}

/// Postgres-backed entity store.
#[derive(Debug, Clone)]
pub struct PgStores {
    pool: Arc<PgPool>,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Run the embedded DDL (idempotent).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(schema::CREATE_TABLES)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Unavailable(
            "postgres backend requires a tokio runtime context".to_string(),
        )
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Constraint(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

fn corrupt(what: &str, detail: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {detail}"))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("users.id", e))?;
    let role: String = row.try_get("role").map_err(|e| corrupt("users.role", e))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| corrupt("users.status", e))?;
    Ok(User::restore(
        UserId::from_uuid(id),
        row.try_get("name").map_err(|e| corrupt("users.name", e))?,
        row.try_get("email").map_err(|e| corrupt("users.email", e))?,
        row.try_get("phone").map_err(|e| corrupt("users.phone", e))?,
        Role::parse(&role).map_err(|e| corrupt("users.role", e))?,
        PasswordHash::from_digest(
            row.try_get::<String, _>("password_hash")
                .map_err(|e| corrupt("users.password_hash", e))?,
        ),
        parse_account_status(&status)?,
        row.try_get("created_at")
            .map_err(|e| corrupt("users.created_at", e))?,
    ))
}

fn parse_account_status(s: &str) -> Result<AccountStatus, StoreError> {
    match s {
        "active" => Ok(AccountStatus::Active),
        "pending" => Ok(AccountStatus::Pending),
        "inactive" => Ok(AccountStatus::Inactive),
        other => Err(corrupt("users.status", other)),
    }
}

fn parse_crop_status(s: &str) -> Result<CropStatus, StoreError> {
    match s {
        "available" => Ok(CropStatus::Available),
        "in_transit" => Ok(CropStatus::InTransit),
        "delivered" => Ok(CropStatus::Delivered),
        "sold" => Ok(CropStatus::Sold),
        other => Err(corrupt("crops.status", other)),
    }
}

fn parse_delivery_status(s: &str) -> Result<DeliveryStatus, StoreError> {
    match s {
        "pending" => Ok(DeliveryStatus::Pending),
        "in_transit" => Ok(DeliveryStatus::InTransit),
        "delivered" => Ok(DeliveryStatus::Delivered),
        other => Err(corrupt("deliveries.status", other)),
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, StoreError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "failed" => Ok(PaymentStatus::Failed),
        other => Err(corrupt("payments.status", other)),
    }
}

fn crop_from_row(row: &PgRow) -> Result<Crop, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("crops.id", e))?;
    let farmer: Uuid = row
        .try_get("farmer_id")
        .map_err(|e| corrupt("crops.farmer_id", e))?;
    let quantity: Decimal = row
        .try_get("quantity")
        .map_err(|e| corrupt("crops.quantity", e))?;
    let unit_price: Decimal = row
        .try_get("unit_price")
        .map_err(|e| corrupt("crops.unit_price", e))?;
    let harvest_date: NaiveDate = row
        .try_get("harvest_date")
        .map_err(|e| corrupt("crops.harvest_date", e))?;
    let batch_id: String = row
        .try_get("batch_id")
        .map_err(|e| corrupt("crops.batch_id", e))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| corrupt("crops.status", e))?;
    Ok(Crop::restore(
        CropId::from_uuid(id),
        UserId::from_uuid(farmer),
        row.try_get("name").map_err(|e| corrupt("crops.name", e))?,
        row.try_get("category")
            .map_err(|e| corrupt("crops.category", e))?,
        Quantity::new(quantity).map_err(|e| corrupt("crops.quantity", e))?,
        Money::new(unit_price).map_err(|e| corrupt("crops.unit_price", e))?,
        harvest_date,
        BatchId::parse(&batch_id).map_err(|e| corrupt("crops.batch_id", e))?,
        parse_crop_status(&status)?,
        row.try_get("photo_url")
            .map_err(|e| corrupt("crops.photo_url", e))?,
        row.try_get("created_at")
            .map_err(|e| corrupt("crops.created_at", e))?,
    ))
}

fn delivery_from_row(row: &PgRow) -> Result<Delivery, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("deliveries.id", e))?;
    let crop: Uuid = row
        .try_get("crop_id")
        .map_err(|e| corrupt("deliveries.crop_id", e))?;
    let distributor: Uuid = row
        .try_get("distributor_id")
        .map_err(|e| corrupt("deliveries.distributor_id", e))?;
    let retailer: Uuid = row
        .try_get("retailer_id")
        .map_err(|e| corrupt("deliveries.retailer_id", e))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| corrupt("deliveries.status", e))?;
    Ok(Delivery::restore(
        DeliveryId::from_uuid(id),
        CropId::from_uuid(crop),
        UserId::from_uuid(distributor),
        UserId::from_uuid(retailer),
        row.try_get("transport_details")
            .map_err(|e| corrupt("deliveries.transport_details", e))?,
        row.try_get("expected_date")
            .map_err(|e| corrupt("deliveries.expected_date", e))?,
        parse_delivery_status(&status)?,
        row.try_get("tracking_note")
            .map_err(|e| corrupt("deliveries.tracking_note", e))?,
        row.try_get("created_at")
            .map_err(|e| corrupt("deliveries.created_at", e))?,
    ))
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("transactions.id", e))?;
    let crop: Uuid = row
        .try_get("crop_id")
        .map_err(|e| corrupt("transactions.crop_id", e))?;
    let from: Uuid = row
        .try_get("from_user_id")
        .map_err(|e| corrupt("transactions.from_user_id", e))?;
    let to: Uuid = row
        .try_get("to_user_id")
        .map_err(|e| corrupt("transactions.to_user_id", e))?;
    let amount: Option<Decimal> = row
        .try_get("amount")
        .map_err(|e| corrupt("transactions.amount", e))?;
    let amount = amount
        .map(|a| Money::new(a).map_err(|e| corrupt("transactions.amount", e)))
        .transpose()?;
    Ok(Transaction::restore(
        TransactionId::from_uuid(id),
        CropId::from_uuid(crop),
        UserId::from_uuid(from),
        UserId::from_uuid(to),
        row.try_get("kind")
            .map_err(|e| corrupt("transactions.kind", e))?,
        amount,
        row.try_get("transport_details")
            .map_err(|e| corrupt("transactions.transport_details", e))?,
        row.try_get("created_at")
            .map_err(|e| corrupt("transactions.created_at", e))?,
    ))
}

fn payment_from_row(row: &PgRow) -> Result<Payment, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("payments.id", e))?;
    let payer: Uuid = row
        .try_get("from_user_id")
        .map_err(|e| corrupt("payments.from_user_id", e))?;
    let payee: Uuid = row
        .try_get("to_user_id")
        .map_err(|e| corrupt("payments.to_user_id", e))?;
    let crop: Option<Uuid> = row
        .try_get("crop_id")
        .map_err(|e| corrupt("payments.crop_id", e))?;
    let amount: Decimal = row
        .try_get("amount")
        .map_err(|e| corrupt("payments.amount", e))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| corrupt("payments.status", e))?;
    Ok(Payment::restore(
        PaymentId::from_uuid(id),
        Money::new(amount).map_err(|e| corrupt("payments.amount", e))?,
        UserId::from_uuid(payer),
        UserId::from_uuid(payee),
        crop.map(CropId::from_uuid),
        parse_payment_status(&status)?,
        row.try_get("method")
            .map_err(|e| corrupt("payments.method", e))?,
        row.try_get("external_reference")
            .map_err(|e| corrupt("payments.external_reference", e))?,
        row.try_get("created_at")
            .map_err(|e| corrupt("payments.created_at", e))?,
    ))
}

impl UserStore for PgStores {
    fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        runtime_handle()?.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO users (id, name, email, phone, role, password_hash, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(user.id_typed().as_uuid())
            .bind(user.name())
            .bind(user.email())
            .bind(user.phone())
            .bind(user.role().as_str())
            .bind(user.password_hash().as_str())
            .bind(account_status_str(user.status()))
            .bind(user.created_at())
            .execute(&*pool)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
            Ok(())
        })
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("get_user", e))?;
            row.as_ref().map(user_from_row).transpose()
        })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let pool = self.pool.clone();
        let email = email.to_string();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
            row.as_ref().map(user_from_row).transpose()
        })
    }

    fn update_user_status(&self, id: &UserId, status: AccountStatus) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let result = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
                .bind(account_status_str(status))
                .bind(id)
                .execute(&*pool)
                .await
                .map_err(|e| map_sqlx_error("update_user_status", e))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let pool = self.pool.clone();
        let role = filter.role.map(|r| r.as_str());
        let status = filter.status.map(account_status_str);
        let query = filter.query.clone().map(|q| format!("%{}%", q.to_lowercase()));
        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM users
                WHERE ($1::text IS NULL OR role = $1)
                  AND ($2::text IS NULL OR status = $2)
                  AND ($3::text IS NULL OR LOWER(name) LIKE $3 OR LOWER(email) LIKE $3)
                ORDER BY created_at ASC
                LIMIT $4
                "#,
            )
            .bind(role)
            .bind(status)
            .bind(query)
            .bind(limit)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
            rows.iter().map(user_from_row).collect()
        })
    }
}

fn account_status_str(status: AccountStatus) -> &'static str {
    match status {
        AccountStatus::Active => "active",
        AccountStatus::Pending => "pending",
        AccountStatus::Inactive => "inactive",
    }
}

impl CropStore for PgStores {
    fn insert_crop(&self, crop: Crop) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        runtime_handle()?.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO crops
                    (id, farmer_id, name, category, quantity, unit_price,
                     harvest_date, batch_id, status, photo_url, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(crop.id_typed().as_uuid())
            .bind(crop.farmer().as_uuid())
            .bind(crop.name())
            .bind(crop.category())
            .bind(crop.quantity().kilograms())
            .bind(crop.unit_price().amount())
            .bind(crop.harvest_date())
            .bind(crop.batch_id().as_str())
            .bind(crop.status().as_str())
            .bind(crop.photo_url())
            .bind(crop.created_at())
            .execute(&*pool)
            .await
            .map_err(|e| map_sqlx_error("insert_crop", e))?;
            Ok(())
        })
    }

    fn get_crop(&self, id: &CropId) -> Result<Option<Crop>, StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM crops WHERE id = $1")
                .bind(id)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("get_crop", e))?;
            row.as_ref().map(crop_from_row).transpose()
        })
    }

    fn find_crop_by_batch(&self, batch_id: &BatchId) -> Result<Option<Crop>, StoreError> {
        let pool = self.pool.clone();
        let batch = batch_id.as_str().to_string();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM crops WHERE batch_id = $1")
                .bind(&batch)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("find_crop_by_batch", e))?;
            row.as_ref().map(crop_from_row).transpose()
        })
    }

    fn update_crop_status(
        &self,
        id: &CropId,
        expected: CropStatus,
        next: CropStatus,
    ) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let result = sqlx::query("UPDATE crops SET status = $1 WHERE id = $2 AND status = $3")
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .execute(&*pool)
                .await
                .map_err(|e| map_sqlx_error("update_crop_status", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!(
                    "crop {id} was not '{expected}'"
                )));
            }
            Ok(())
        })
    }

    fn set_crop_status(&self, id: &CropId, next: CropStatus) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let result = sqlx::query("UPDATE crops SET status = $1 WHERE id = $2")
                .bind(next.as_str())
                .bind(id)
                .execute(&*pool)
                .await
                .map_err(|e| map_sqlx_error("set_crop_status", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!("crop {id} no longer exists")));
            }
            Ok(())
        })
    }

    fn list_crops(&self, filter: &CropFilter) -> Result<Vec<Crop>, StoreError> {
        let pool = self.pool.clone();
        let farmer = filter.farmer.map(|f| *f.as_uuid());
        let status = filter.status.map(|s| s.as_str());
        let category = filter.category.clone();
        let max_price = filter.max_unit_price;
        let query = filter.query.clone().map(|q| format!("%{}%", q.to_lowercase()));
        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM crops
                WHERE ($1::uuid IS NULL OR farmer_id = $1)
                  AND ($2::text IS NULL OR status = $2)
                  AND ($3::text IS NULL OR LOWER(category) = LOWER($3))
                  AND ($4::numeric IS NULL OR unit_price <= $4)
                  AND ($5::text IS NULL OR LOWER(name) LIKE $5 OR LOWER(batch_id) LIKE $5)
                ORDER BY created_at ASC
                LIMIT $6
                "#,
            )
            .bind(farmer)
            .bind(status)
            .bind(category)
            .bind(max_price)
            .bind(query)
            .bind(limit)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_crops", e))?;
            rows.iter().map(crop_from_row).collect()
        })
    }
}

impl DeliveryStore for PgStores {
    fn insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        runtime_handle()?.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO deliveries
                    (id, crop_id, distributor_id, retailer_id, transport_details,
                     expected_date, status, tracking_note, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(delivery.id_typed().as_uuid())
            .bind(delivery.crop().as_uuid())
            .bind(delivery.distributor().as_uuid())
            .bind(delivery.retailer().as_uuid())
            .bind(delivery.transport_details())
            .bind(delivery.expected_date())
            .bind(delivery.status().as_str())
            .bind(delivery.tracking_note())
            .bind(delivery.created_at())
            .execute(&*pool)
            .await
            .map_err(|e| map_sqlx_error("insert_delivery", e))?;
            Ok(())
        })
    }

    fn get_delivery(&self, id: &DeliveryId) -> Result<Option<Delivery>, StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM deliveries WHERE id = $1")
                .bind(id)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("get_delivery", e))?;
            row.as_ref().map(delivery_from_row).transpose()
        })
    }

    fn update_delivery_status(
        &self,
        id: &DeliveryId,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let result =
                sqlx::query("UPDATE deliveries SET status = $1 WHERE id = $2 AND status = $3")
                    .bind(next.as_str())
                    .bind(id)
                    .bind(expected.as_str())
                    .execute(&*pool)
                    .await
                    .map_err(|e| map_sqlx_error("update_delivery_status", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!(
                    "delivery {id} was not '{expected}'"
                )));
            }
            Ok(())
        })
    }

    fn update_delivery_tracking(&self, id: &DeliveryId, note: &str) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        let note = note.to_string();
        runtime_handle()?.block_on(async move {
            let result = sqlx::query("UPDATE deliveries SET tracking_note = $1 WHERE id = $2")
                .bind(&note)
                .bind(id)
                .execute(&*pool)
                .await
                .map_err(|e| map_sqlx_error("update_delivery_tracking", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!(
                    "delivery {id} no longer exists"
                )));
            }
            Ok(())
        })
    }

    fn delete_delivery(&self, id: &DeliveryId) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            sqlx::query("DELETE FROM deliveries WHERE id = $1")
                .bind(id)
                .execute(&*pool)
                .await
                .map_err(|e| map_sqlx_error("delete_delivery", e))?;
            Ok(())
        })
    }

    fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, StoreError> {
        let pool = self.pool.clone();
        let distributor = filter.distributor.map(|u| *u.as_uuid());
        let retailer = filter.retailer.map(|u| *u.as_uuid());
        let crop = filter.crop.map(|c| *c.as_uuid());
        let status = filter.status.map(|s| s.as_str());
        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM deliveries
                WHERE ($1::uuid IS NULL OR distributor_id = $1)
                  AND ($2::uuid IS NULL OR retailer_id = $2)
                  AND ($3::uuid IS NULL OR crop_id = $3)
                  AND ($4::text IS NULL OR status = $4)
                ORDER BY created_at ASC
                LIMIT $5
                "#,
            )
            .bind(distributor)
            .bind(retailer)
            .bind(crop)
            .bind(status)
            .bind(limit)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_deliveries", e))?;
            rows.iter().map(delivery_from_row).collect()
        })
    }
}

impl TransactionStore for PgStores {
    fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        runtime_handle()?.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO transactions
                    (id, crop_id, from_user_id, to_user_id, kind, amount,
                     transport_details, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(transaction.id_typed().as_uuid())
            .bind(transaction.crop().as_uuid())
            .bind(transaction.from().as_uuid())
            .bind(transaction.to().as_uuid())
            .bind(transaction.kind())
            .bind(transaction.amount().map(|a| a.amount()))
            .bind(transaction.transport_details())
            .bind(transaction.created_at())
            .execute(&*pool)
            .await
            .map_err(|e| map_sqlx_error("insert_transaction", e))?;
            Ok(())
        })
    }

    fn list_transactions_for_crop(&self, crop: &CropId) -> Result<Vec<Transaction>, StoreError> {
        let pool = self.pool.clone();
        let crop = *crop.as_uuid();
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                "SELECT * FROM transactions WHERE crop_id = $1 ORDER BY created_at ASC",
            )
            .bind(crop)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions_for_crop", e))?;
            rows.iter().map(transaction_from_row).collect()
        })
    }

    fn list_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let pool = self.pool.clone();
        let user = *user.as_uuid();
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM transactions
                WHERE from_user_id = $1 OR to_user_id = $1
                ORDER BY created_at ASC
                "#,
            )
            .bind(user)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions_for_user", e))?;
            rows.iter().map(transaction_from_row).collect()
        })
    }
}

impl PaymentStore for PgStores {
    fn insert_payment(&self, payment: Payment) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        runtime_handle()?.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO payments
                    (id, amount, from_user_id, to_user_id, crop_id, status,
                     method, external_reference, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(payment.id_typed().as_uuid())
            .bind(payment.amount().amount())
            .bind(payment.payer().as_uuid())
            .bind(payment.payee().as_uuid())
            .bind(payment.crop().map(|c| *c.as_uuid()))
            .bind(payment.status().as_str())
            .bind(payment.method())
            .bind(payment.external_reference())
            .bind(payment.created_at())
            .execute(&*pool)
            .await
            .map_err(|e| map_sqlx_error("insert_payment", e))?;
            Ok(())
        })
    }

    fn get_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        runtime_handle()?.block_on(async move {
            let row = sqlx::query("SELECT * FROM payments WHERE id = $1")
                .bind(id)
                .fetch_optional(&*pool)
                .await
                .map_err(|e| map_sqlx_error("get_payment", e))?;
            row.as_ref().map(payment_from_row).transpose()
        })
    }

    fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let pool = self.pool.clone();
        let payer = filter.payer.map(|u| *u.as_uuid());
        let payee = filter.payee.map(|u| *u.as_uuid());
        let crop = filter.crop.map(|c| *c.as_uuid());
        let status = filter.status.map(|s| s.as_str());
        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        runtime_handle()?.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM payments
                WHERE ($1::uuid IS NULL OR from_user_id = $1)
                  AND ($2::uuid IS NULL OR to_user_id = $2)
                  AND ($3::uuid IS NULL OR crop_id = $3)
                  AND ($4::text IS NULL OR status = $4)
                ORDER BY created_at ASC
                LIMIT $5
                "#,
            )
            .bind(payer)
            .bind(payee)
            .bind(crop)
            .bind(status)
            .bind(limit)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_sqlx_error("list_payments", e))?;
            rows.iter().map(payment_from_row).collect()
        })
    }
}

/// Postgres-backed trace ledger.
///
/// `recorded_at` and `sequence` are assigned inside the insert statement; the
/// unique `(batch_id, sequence)` constraint turns a concurrent append into a
/// retryable error instead of two events sharing a slot.
#[derive(Debug, Clone)]
pub struct PgTraceLedger {
    pool: Arc<PgPool>,
}

impl PgTraceLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_ledger_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match map_sqlx_error(operation, err) {
        StoreError::Constraint(msg) => LedgerError::InvalidAppend(msg),
        other => LedgerError::Unavailable(other.to_string()),
    }
}

fn trace_event_from_row(row: &PgRow) -> Result<TraceEvent, LedgerError> {
    let bad = |what: &str, e: &dyn core::fmt::Display| {
        LedgerError::Unavailable(format!("corrupt traceability row ({what}): {e}"))
    };
    let event_id: Uuid = row
        .try_get("event_id")
        .map_err(|e| bad("event_id", &e))?;
    let batch_id: String = row
        .try_get("batch_id")
        .map_err(|e| bad("batch_id", &e))?;
    let step_type: String = row
        .try_get("step_type")
        .map_err(|e| bad("step_type", &e))?;
    let user_id: Uuid = row.try_get("user_id").map_err(|e| bad("user_id", &e))?;
    let sequence: i64 = row.try_get("sequence").map_err(|e| bad("sequence", &e))?;
    let recorded_at: DateTime<Utc> = row
        .try_get("recorded_at")
        .map_err(|e| bad("recorded_at", &e))?;
    let status: String = row.try_get("status").map_err(|e| bad("status", &e))?;

    Ok(TraceEvent {
        event_id,
        batch_id: BatchId::from_str(&batch_id).map_err(|e| bad("batch_id", &e))?,
        step_type: StepType::parse(&step_type),
        actor: UserId::from_uuid(user_id),
        details: row.try_get("details").map_err(|e| bad("details", &e))?,
        location: row.try_get("location").map_err(|e| bad("location", &e))?,
        sequence: sequence as u64,
        recorded_at,
        status: if status == "active" {
            EventStatus::Active
        } else {
            EventStatus::Archived
        },
    })
}

impl TraceLedger for PgTraceLedger {
    fn append(&self, event: TraceAppend) -> Result<TraceEvent, LedgerError> {
        let pool = self.pool.clone();
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            LedgerError::Unavailable("postgres ledger requires a tokio runtime context".to_string())
        })?;
        handle.block_on(async move {
            let row = sqlx::query(
                r#"
                INSERT INTO traceability
                    (event_id, batch_id, step_type, user_id, location, details, sequence)
                VALUES (
                    $1, $2, $3, $4, $5, $6,
                    (SELECT COALESCE(MAX(sequence), 0) + 1 FROM traceability WHERE batch_id = $2)
                )
                RETURNING *
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(event.batch_id.as_str())
            .bind(event.step_type.as_str())
            .bind(event.actor.as_uuid())
            .bind(event.location.as_deref())
            .bind(&event.details)
            .fetch_one(&*pool)
            .await
            .map_err(|e| map_ledger_error("append", e))?;
            trace_event_from_row(&row)
        })
    }

    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<TraceEvent>, LedgerError> {
        let pool = self.pool.clone();
        let batch = batch_id.as_str().to_string();
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            LedgerError::Unavailable("postgres ledger requires a tokio runtime context".to_string())
        })?;
        handle.block_on(async move {
            let rows = sqlx::query(
                r#"
                SELECT * FROM traceability
                WHERE batch_id = $1
                ORDER BY recorded_at ASC, sequence ASC
                "#,
            )
            .bind(&batch)
            .fetch_all(&*pool)
            .await
            .map_err(|e| map_ledger_error("list_by_batch", e))?;
            rows.iter().map(trace_event_from_row).collect()
        })
    }
}
