//! Shared-secret access gate
//!
//! The gateway accepts any of a configured set of passwords. With no
//! passwords configured every caller is let in.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::AccessConfig;

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    passwords: Vec<String>,
}

impl AccessGate {
    #[must_use]
    pub fn new(config: &AccessConfig) -> Self {
        Self::from_list(&config.passwords)
    }

    /// Parse a comma-separated list, trimming entries and dropping blanks
    #[must_use]
    pub fn from_list(raw: &str) -> Self {
        let passwords = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { passwords }
    }

    #[must_use]
    pub fn require_password(&self) -> bool {
        !self.passwords.is_empty()
    }

    #[must_use]
    pub fn multi_user(&self) -> bool {
        self.passwords.len() > 1
    }

    #[must_use]
    pub fn password_count(&self) -> usize {
        self.passwords.len()
    }

    /// Check a candidate against the accepted set.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        if self.passwords.is_empty() {
            return true;
        }
        // evaluate every entry so timing does not reveal which one matched
        self.passwords.iter().fold(false, |matched, accepted| {
            matched | bool::from(accepted.as_bytes().ct_eq(candidate.as_bytes()))
        })
    }
}

/// Lowercase hex SHA-256 of a password, handed back to clients on success
#[must_use]
pub fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
