//! Payments domain module: monetary transfers and custody-transfer records.
//!
//! Both record kinds are facts: a `Transaction` is append-only by
//! construction (no mutators exist), and a `Payment`'s status is fixed when
//! the record is written.

pub mod payment;
pub mod transaction;

pub use payment::{NewPayment, Payment, PaymentStatus};
pub use transaction::{NewTransaction, Transaction};
