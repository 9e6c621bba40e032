//! `agritrace-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The session
//! layer (external collaborator) hands the core an already-authenticated user
//! id + role; everything here is a deterministic policy or hashing function.

pub mod action;
pub mod authorize;
pub mod credentials;
pub mod role;

pub use action::ChainAction;
pub use authorize::{authorize, AuthzError};
pub use credentials::PasswordHash;
pub use role::Role;
