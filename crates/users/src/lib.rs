//! Users domain module: actor identity + account lifecycle.
//!
//! Business rules only, implemented as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod user;

pub use user::{AccountStatus, NewUser, User};
