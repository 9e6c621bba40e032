//! `agritrace-chain` — the supply-chain operations.
//!
//! This is the layer presentation code calls into. Every mutating operation
//! takes the acting user (id + role as supplied by the session service),
//! authorizes centrally, validates transitions through the domain types, and
//! coordinates store writes with ledger appends — conditional updates turn
//! concurrent clobbering into typed conflicts, and compensating writes clean
//! up when a multi-step operation fails partway.

pub mod error;
pub mod service;

pub use error::ChainError;
pub use service::{Actor, ChainService, RegisterUser, SaleRecord};
