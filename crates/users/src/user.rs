use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agritrace_auth::{PasswordHash, Role};
use agritrace_core::{DomainError, DomainResult, Entity, UserId};

/// Account lifecycle status.
///
/// Only an Admin mutates this (enforced at the orchestration layer); users
/// are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Inactive,
}

/// Registration input, validated into a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password_hash: PasswordHash,
}

/// A registered actor: identity + role.
///
/// Role is immutable after creation; there is no setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    role: Role,
    password_hash: PasswordHash,
    status: AccountStatus,
    created_at: DateTime<Utc>,
}

impl User {
    /// Validate registration input and build the account.
    ///
    /// New accounts start `Active` (matching the source's open registration);
    /// an Admin can park them `Pending`/`Inactive` afterwards.
    pub fn register(id: UserId, input: NewUser, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let email = input.email.trim().to_string();
        if !email.contains('@') || email.len() < 3 {
            return Err(DomainError::validation("email is not plausible"));
        }
        if input.phone.trim().is_empty() {
            return Err(DomainError::validation("phone cannot be empty"));
        }

        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            email,
            phone: input.phone.trim().to_string(),
            role: input.role,
            password_hash: input.password_hash,
            status: AccountStatus::Active,
            created_at,
        })
    }

    /// Rehydrate a previously validated record from a storage backend.
    ///
    /// Skips registration validation; stored rows were validated on the way in.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UserId,
        name: String,
        email: String,
        phone: String,
        role: Role,
        password_hash: PasswordHash,
        status: AccountStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            phone,
            role,
            password_hash,
            status,
            created_at,
        }
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this account may log in / act.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Admin action: activate a pending or deactivated account.
    pub fn approve(&mut self) -> DomainResult<()> {
        if self.status == AccountStatus::Active {
            return Err(DomainError::conflict("account is already active"));
        }
        self.status = AccountStatus::Active;
        Ok(())
    }

    /// Admin action: take an account out of service.
    pub fn deactivate(&mut self) -> DomainResult<()> {
        if self.status == AccountStatus::Inactive {
            return Err(DomainError::conflict("account is already inactive"));
        }
        self.status = AccountStatus::Inactive;
        Ok(())
    }

    /// Admin action: restore a deactivated account.
    pub fn reactivate(&mut self) -> DomainResult<()> {
        self.approve()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_input(role: Role) -> NewUser {
        NewUser {
            name: "Asha Patel".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+911234567890".to_string(),
            role,
            password_hash: PasswordHash::derive("a-strong-one").unwrap(),
        }
    }

    fn registered(role: Role) -> User {
        User::register(UserId::new(), test_input(role), Utc::now()).unwrap()
    }

    #[test]
    fn register_trims_and_stores_fields() {
        let mut input = test_input(Role::Farmer);
        input.name = "  Asha Patel  ".to_string();
        let user = User::register(UserId::new(), input, Utc::now()).unwrap();
        assert_eq!(user.name(), "Asha Patel");
        assert_eq!(user.role(), Role::Farmer);
        assert_eq!(user.status(), AccountStatus::Active);
        assert!(user.is_active());
    }

    #[test]
    fn register_rejects_blank_name() {
        let mut input = test_input(Role::Buyer);
        input.name = "   ".to_string();
        let err = User::register(UserId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_rejects_implausible_email() {
        let mut input = test_input(Role::Buyer);
        input.email = "not-an-email".to_string();
        let err = User::register(UserId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deactivate_then_reactivate() {
        let mut user = registered(Role::Retailer);
        user.deactivate().unwrap();
        assert_eq!(user.status(), AccountStatus::Inactive);
        assert!(!user.is_active());

        user.reactivate().unwrap();
        assert!(user.is_active());
    }

    #[test]
    fn repeated_status_moves_conflict() {
        let mut user = registered(Role::Distributor);
        assert!(matches!(user.approve(), Err(DomainError::Conflict(_))));

        user.deactivate().unwrap();
        assert!(matches!(user.deactivate(), Err(DomainError::Conflict(_))));
    }
}
