// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salted password digests.
//!
//! Each password is keyed into HMAC-SHA256 with a per-user random salt.
//! Verification goes through `Mac::verify_slice`, which compares in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Stored form of a password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: [u8; 16],
    digest: Vec<u8>,
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

impl PasswordDigest {
    pub fn new(password: &str) -> Self {
        let salt = *Uuid::new_v4().as_bytes();
        let digest = compute(&salt, password);
        Self { salt, digest }
    }

    pub fn verify(&self, password: &str) -> bool {
        // HMAC accepts keys of any length, so this cannot fail.
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.salt) else {
            return false;
        };
        mac.update(password.as_bytes());
        mac.verify_slice(&self.digest).is_ok()
    }
}

fn compute(salt: &[u8], password: &str) -> Vec<u8> {
    match HmacSha256::new_from_slice(salt) {
        Ok(mut mac) => {
            mac.update(password.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_password() {
        let digest = PasswordDigest::new("Passw0rd!");
        assert!(digest.verify("Passw0rd!"));
        assert!(!digest.verify("passw0rd!"));
        assert!(!digest.verify(""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = PasswordDigest::new("Passw0rd!");
        let b = PasswordDigest::new("Passw0rd!");
        assert_ne!(a, b);
        assert_eq!(format!("{a:?}"), "PasswordDigest(..)");
    }
}
