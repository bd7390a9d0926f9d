//! Credential Store
//!
//! Derives and verifies password hashes with PBKDF2-HMAC-SHA512.
//!
//! - per-credential random salt (16 bytes by default)
//! - configurable iteration count, never below [`MIN_ITERATIONS`]
//! - 64-byte derived key, stored hex encoded next to its hex salt
//! - verification recomputes with the stored salt and compares in constant
//!   time; malformed stored values fail closed
//!
//! Derivation is CPU bound, so async callers go through
//! [`CredentialStore::derive_blocking`] / [`CredentialStore::verify_blocking`]
//! which run on the blocking thread pool.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{constant_time_eq, random_bytes};

pub const MIN_ITERATIONS: u32 = 100_000;
pub const MIN_SALT_LEN: usize = 16;
pub const MIN_KEY_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialConfig {
    pub iterations: u32,
    pub salt_len: usize,
    pub key_len: usize,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
            salt_len: MIN_SALT_LEN,
            key_len: MIN_KEY_LEN,
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Iteration count {0} is below the minimum of 100000")]
    WeakIterations(u32),

    #[error("Salt length {0} is below the minimum of 16 bytes")]
    ShortSalt(usize),

    #[error("Derived key length {0} is below the minimum of 64 bytes")]
    ShortKey(usize),

    #[error("Credential worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Hash and salt, both hex encoded, as persisted on the user record.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedCredential {
    pub hash: String,
    pub salt: String,
}

impl std::fmt::Debug for DerivedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedCredential")
            .field("hash", &"[HASH]")
            .field("salt", &self.salt)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    config: CredentialConfig,
}

impl CredentialStore {
    pub fn new(config: CredentialConfig) -> Result<Self, CredentialError> {
        if config.iterations < MIN_ITERATIONS {
            return Err(CredentialError::WeakIterations(config.iterations));
        }
        if config.salt_len < MIN_SALT_LEN {
            return Err(CredentialError::ShortSalt(config.salt_len));
        }
        if config.key_len < MIN_KEY_LEN {
            return Err(CredentialError::ShortKey(config.key_len));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Derive a fresh hash with a new random salt.
    pub fn derive(&self, password: &str) -> DerivedCredential {
        let salt = random_bytes(self.config.salt_len);
        let key = self.compute(password.as_bytes(), &salt, self.config.key_len);
        DerivedCredential {
            hash: hex::encode(key.as_slice()),
            salt: hex::encode(&salt),
        }
    }

    /// Recompute with the stored salt and compare in constant time.
    ///
    /// The stored hash length decides the derived length, so credentials
    /// written with a longer key remain verifiable. Undecodable input,
    /// or a stored key shorter than [`MIN_KEY_LEN`], is a failed match.
    pub fn verify(&self, password: &str, hash: &str, salt: &str) -> bool {
        let (Ok(expected), Ok(salt)) = (hex::decode(hash), hex::decode(salt)) else {
            return false;
        };
        if expected.len() < MIN_KEY_LEN || salt.is_empty() {
            return false;
        }
        let actual = self.compute(password.as_bytes(), &salt, expected.len());
        constant_time_eq(&actual, &expected)
    }

    pub async fn derive_blocking(
        &self,
        password: Zeroizing<String>,
    ) -> Result<DerivedCredential, CredentialError> {
        let store = self.clone();
        let derived = tokio::task::spawn_blocking(move || store.derive(&password)).await?;
        Ok(derived)
    }

    pub async fn verify_blocking(
        &self,
        password: Zeroizing<String>,
        hash: String,
        salt: String,
    ) -> Result<bool, CredentialError> {
        let store = self.clone();
        let ok =
            tokio::task::spawn_blocking(move || store.verify(&password, &hash, &salt)).await?;
        Ok(ok)
    }

    fn compute(&self, password: &[u8], salt: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; len]);
        pbkdf2_hmac::<Sha512>(password, salt, self.config.iterations, &mut out);
        out
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self {
            config: CredentialConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_then_verify() {
        let store = CredentialStore::default();
        let derived = store.derive("Str0ng!Passw0rd123");

        assert!(store.verify("Str0ng!Passw0rd123", &derived.hash, &derived.salt));
        assert!(!store.verify("Str0ng!Passw0rd124", &derived.hash, &derived.salt));
        assert!(!store.verify("", &derived.hash, &derived.salt));
    }

    #[test]
    fn test_output_sizes() {
        let store = CredentialStore::default();
        let derived = store.derive("Str0ng!Passw0rd123");
        assert_eq!(derived.hash.len(), 128); // 64 bytes hex
        assert_eq!(derived.salt.len(), 32); // 16 bytes hex
    }

    #[test]
    fn test_salts_are_unique() {
        let store = CredentialStore::default();
        let a = store.derive("Str0ng!Passw0rd123");
        let b = store.derive("Str0ng!Passw0rd123");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_malformed_stored_values_fail_closed() {
        let store = CredentialStore::default();
        let derived = store.derive("Str0ng!Passw0rd123");

        assert!(!store.verify("Str0ng!Passw0rd123", "not-hex", &derived.salt));
        assert!(!store.verify("Str0ng!Passw0rd123", &derived.hash, "zz"));
        assert!(!store.verify("Str0ng!Passw0rd123", &derived.hash[..64], &derived.salt));
        assert!(!store.verify("Str0ng!Passw0rd123", &derived.hash, ""));
    }

    #[test]
    fn test_weak_configuration_rejected() {
        let weak = CredentialConfig {
            iterations: 1_000,
            ..CredentialConfig::default()
        };
        assert!(matches!(
            CredentialStore::new(weak),
            Err(CredentialError::WeakIterations(1_000))
        ));

        let short_salt = CredentialConfig {
            salt_len: 8,
            ..CredentialConfig::default()
        };
        assert!(matches!(
            CredentialStore::new(short_salt),
            Err(CredentialError::ShortSalt(8))
        ));

        let short_key = CredentialConfig {
            key_len: 32,
            ..CredentialConfig::default()
        };
        assert!(matches!(
            CredentialStore::new(short_key),
            Err(CredentialError::ShortKey(32))
        ));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let store = CredentialStore::default();
        let derived = store
            .derive_blocking(Zeroizing::new("Str0ng!Passw0rd123".to_string()))
            .await
            .unwrap();
        let ok = store
            .verify_blocking(
                Zeroizing::new("Str0ng!Passw0rd123".to_string()),
                derived.hash.clone(),
                derived.salt.clone(),
            )
            .await
            .unwrap();
        assert!(ok);
    }
}
