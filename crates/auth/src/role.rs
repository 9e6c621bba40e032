use serde::{Deserialize, Serialize};

use agritrace_core::DomainError;

/// Supply-chain role. Closed set; a user's role is fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Farmer,
    Distributor,
    Retailer,
    Buyer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Farmer,
        Role::Distributor,
        Role::Retailer,
        Role::Buyer,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "Farmer",
            Role::Distributor => "Distributor",
            Role::Retailer => "Retailer",
            Role::Buyer => "Buyer",
            Role::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "Farmer" => Ok(Role::Farmer),
            "Distributor" => Ok(Role::Distributor),
            "Retailer" => Ok(Role::Retailer),
            "Buyer" => Ok(Role::Buyer),
            "Admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn parse_rejects_unknown_role() {
        assert!(Role::parse("Wholesaler").is_err());
        // Case-sensitive on purpose: the stored column uses capitalized names.
        assert!(Role::parse("farmer").is_err());
    }
}
