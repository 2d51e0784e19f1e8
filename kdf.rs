//! Password-based key derivation (Argon2id).
//!
//! [`derive_key`] turns a password and a per-file salt into the 256-bit key
//! used for every chunk of one container. The derivation is deterministic
//! for identical inputs and deliberately memory-hard.
//!
//! The parameters are not stored in the container, so the encrypting and
//! decrypting side must agree on [`KdfParams`].

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptError, Result};

/// Derived key length in bytes (256 bits)
pub const KEY_LEN: usize = 32;

/// Salt length written into every container header
pub const SALT_LEN: usize = 16;

/// A derived key. Wiped when dropped, including on early-error paths.
pub type SecretKey = Zeroizing<[u8; KEY_LEN]>;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Check the parameters against Argon2's limits
    pub fn validate(&self) -> Result<()> {
        self.to_argon2().map(|_| ())
    }

    fn to_argon2(&self) -> Result<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| CryptError::key_derivation(format!("invalid Argon2 parameters: {}", e)))
    }
}

/// Derive a 32-byte key from `password` and `salt`.
///
/// Empty passwords and empty salts are rejected with `InvalidParams`.
pub fn derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<SecretKey> {
    if password.is_empty() {
        return Err(CryptError::invalid_params("password must not be empty"));
    }
    if salt.is_empty() {
        return Err(CryptError::invalid_params("salt must not be empty"));
    }

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, key.as_mut())
        .map_err(|e| CryptError::key_derivation(format!("Argon2id failed: {}", e)))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn fast() -> KdfParams {
        KdfParams::new(256, 1, 1)
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [0x42u8; SALT_LEN];
        let key1 = derive_key(b"correct horse", &salt, &fast()).unwrap();
        let key2 = derive_key(b"correct horse", &salt, &fast()).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn test_derive_key_different_salts() {
        let key1 = derive_key(b"correct horse", &[0x42u8; SALT_LEN], &fast()).unwrap();
        let key2 = derive_key(b"correct horse", &[0x43u8; SALT_LEN], &fast()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_derive_key_different_passwords() {
        let salt = [7u8; SALT_LEN];
        let key1 = derive_key(b"correct horse", &salt, &fast()).unwrap();
        let key2 = derive_key(b"wrong password", &salt, &fast()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_empty_password_rejected() {
        let err = derive_key(b"", &[1u8; SALT_LEN], &fast()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn test_empty_salt_rejected() {
        let err = derive_key(b"pw", &[], &fast()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = KdfParams::new(256, 0, 1);
        assert!(params.validate().is_err());
        let err = derive_key(b"pw", &[1u8; SALT_LEN], &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyDerivation);
    }

    #[test]
    fn test_default_params_are_valid() {
        KdfParams::default().validate().unwrap();
    }
}
