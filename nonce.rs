//! Per-chunk nonce derivation.
//!
//! Every chunk nonce is the file's random 8-byte base followed by the
//! big-endian 32-bit chunk index:
//!
//! ```text
//! [base_nonce:8][index:4]
//! ```
//!
//! For a fixed base the mapping is injective over the whole `u32` domain, so
//! a single file never repeats a nonce. A base must never be reused across
//! files or keys; a fresh one is drawn for every encryption.

use rand_core::{OsRng, RngCore};

/// Length of the random per-file base
pub const BASE_NONCE_LEN: usize = 8;

/// Length of the nonce handed to the AEAD primitive (96 bits)
pub const NONCE_LEN: usize = 12;

pub fn nonce_for(base_nonce: &[u8; BASE_NONCE_LEN], index: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..BASE_NONCE_LEN].copy_from_slice(base_nonce);
    nonce[BASE_NONCE_LEN..].copy_from_slice(&index.to_be_bytes());
    nonce
}

/// Draw a fresh base from the OS RNG
pub fn random_base_nonce() -> [u8; BASE_NONCE_LEN] {
    let mut base = [0u8; BASE_NONCE_LEN];
    OsRng.fill_bytes(&mut base);
    base
}
