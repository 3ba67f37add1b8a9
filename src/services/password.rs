//! Password hashing.
//!
//! Digests are PHC strings, which name their algorithm, version, cost
//! parameters and salt, so the cost can change without touching stored
//! records:
//!
//! ```text
//! $argon2id$v=19$m=19456,t=2,p=1$<salt-b64>$<hash-b64>
//! ```

use crate::{Error, Result};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// Hashes and verifies passwords.
pub trait PasswordHasher: Send + Sync {
    /// Produces a salted digest of `password`.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest cannot be computed.
    fn hash(&self, password: &SecretString) -> Result<String>;

    /// Returns true if `password` produced `digest`. Malformed digests never match.
    fn verify(&self, password: &SecretString, digest: &str) -> bool;
}

/// Argon2id password hasher.
///
/// New digests use the configured cost; verification reads the cost stored
/// in each digest.
///
/// # Example
///
/// ```rust
/// use focusgrid::services::{Argon2PasswordHasher, PasswordHasher};
/// use secrecy::SecretString;
///
/// let hasher = Argon2PasswordHasher::default();
/// let password = SecretString::from("hunter_22".to_string());
/// let digest = hasher.hash(&password)?;
/// assert!(digest.starts_with("$argon2id$"));
/// assert!(hasher.verify(&password, &digest));
/// # Ok::<(), focusgrid::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if argon2 rejects the parameters.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| Error::InvalidInput(format!("argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &SecretString) -> Result<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("password salt: {e}")))?;
        let digest = self
            .argon2()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map_err(|e| Error::InvalidInput(format!("password could not be hashed: {e}")))?;
        Ok(digest.to_string())
    }

    fn verify(&self, password: &SecretString, digest: &str) -> bool {
        use argon2::PasswordVerifier as _;

        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        // Variant and cost come from the digest.
        Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn cheap() -> Argon2PasswordHasher {
        Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = cheap();
        let digest = hasher.hash(&secret("correct_horse")).unwrap();
        assert!(hasher.verify(&secret("correct_horse"), &digest));
        assert!(!hasher.verify(&secret("wrong_horse"), &digest));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = cheap();
        let a = hasher.hash(&secret("same_pw")).unwrap();
        let b = hasher.hash(&secret("same_pw")).unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify(&secret("same_pw"), &a));
        assert!(hasher.verify(&secret("same_pw"), &b));
    }

    #[test]
    fn test_digest_layout() {
        let digest = cheap().hash(&secret("abc123")).unwrap();
        let parts: Vec<_> = digest.split('$').collect();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[1], "argon2id");
        assert_eq!(parts[2], "v=19");
        assert_eq!(parts[3], "m=1024,t=1,p=1");
    }

    #[test]
    fn test_default_cost_is_stored_in_digest() {
        let digest = Argon2PasswordHasher::default()
            .hash(&secret("abc123"))
            .unwrap();
        assert!(digest.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_verify_reads_cost_from_digest() {
        let digest = cheap().hash(&secret("abc123")).unwrap();
        assert!(Argon2PasswordHasher::default().verify(&secret("abc123"), &digest));
    }

    #[test]
    fn test_malformed_digests_never_verify() {
        let hasher = cheap();
        for digest in [
            "",
            "plaintext",
            "$argon2id$",
            "$argon2id$v=19$m=1024,t=1,p=1$!!$!!",
            "sha256$00$00",
        ] {
            assert!(!hasher.verify(&secret("plaintext"), digest), "{digest}");
        }
    }

    #[test]
    fn test_rejects_invalid_cost() {
        assert!(matches!(
            Argon2PasswordHasher::with_cost(1024, 0, 1),
            Err(Error::InvalidInput(_))
        ));
    }
}
