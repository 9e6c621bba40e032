use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use agritrace_core::DomainError;

/// Stored credential digest: lowercase hex SHA-256 of the password.
///
/// Matches the digests already present in migrated user rows, so existing
/// accounts keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password.
    pub fn derive(password: &str) -> Result<Self, DomainError> {
        if password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }
        let digest = Sha256::digest(password.as_bytes());
        Ok(Self(hex_lower(digest.as_slice())))
    }

    /// Wrap an already-hashed value (e.g. loaded from the store).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Constant-shape verification: hash the candidate and compare digests.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = Sha256::digest(password.as_bytes());
        self.0 == hex_lower(candidate.as_slice())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_then_verify_succeeds() {
        let hash = PasswordHash::derive("hunter2-but-longer").unwrap();
        assert!(hash.verify("hunter2-but-longer"));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = PasswordHash::derive("correct horse").unwrap();
        assert!(!hash.verify("battery staple"));
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(PasswordHash::derive("").is_err());
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        // Known vector: sha256("admin123")
        let hash = PasswordHash::derive("admin123").unwrap();
        assert_eq!(
            hash.as_str(),
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
    }
}
