//! `agritrace-store` — the entity store.
//!
//! Repository traits for the five entity tables, with an in-memory
//! implementation (tests/dev) and a Postgres implementation (`sqlx`).
//!
//! All writes are independent single-record operations; there is no
//! multi-record atomicity here. Cross-record consistency is the
//! orchestration layer's job (conditional updates + compensating writes).

pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use filter::{CropFilter, DeliveryFilter, PaymentFilter, UserFilter};
pub use memory::InMemoryStores;
pub use postgres::{PgStores, PgTraceLedger};
pub use traits::{CropStore, DeliveryStore, PaymentStore, TransactionStore, UserStore};
