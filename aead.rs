//! The AEAD boundary used by the streaming engine.
//!
//! [`AeadPrimitive`] is the narrow capability the engine needs: seal one
//! buffer into ciphertext plus a detached 16-byte tag, and open it again.
//! `open` fails closed: any altered bit in key, nonce, AAD, ciphertext or tag
//! yields [`CryptError::AuthenticationFailed`] and no plaintext.
//!
//! Implementations:
//!
//! - [`AesGcmAead`]: AES-256-GCM, the default
//! - [`ChaCha20Aead`]: ChaCha20-Poly1305, for hosts without AES instructions
//! - [`TestAead`]: instrumented wrapper that records nonces and can inject failures

use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use zeroize::Zeroizing;

use crate::error::{CryptError, Result};
use crate::kdf::KEY_LEN;
use crate::nonce::NONCE_LEN;

/// Authentication tag length (128 bits)
pub const TAG_LEN: usize = 16;

pub trait AeadPrimitive: Send + Sync {
    /// Short algorithm name, for logs
    fn name(&self) -> &'static str;

    /// Encrypt `plaintext`; the ciphertext has the same length as the input
    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])>;

    /// Verify `tag` and decrypt `ciphertext`
    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>>;
}

impl<T: AeadPrimitive + ?Sized> AeadPrimitive for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        (**self).seal(key, nonce, aad, plaintext)
    }

    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>> {
        (**self).open(key, nonce, aad, ciphertext, tag)
    }
}

fn seal_detached<C>(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|e| CryptError::internal(format!("cipher init failed: {}", e)))?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, &mut buffer)
        .map_err(|e| CryptError::internal(format!("encryption failed: {}", e)))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok((buffer, tag_bytes))
}

fn open_detached<C>(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Zeroizing<Vec<u8>>>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|e| CryptError::internal(format!("cipher init failed: {}", e)))?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            buffer.as_mut_slice(),
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptError::AuthenticationFailed)?;

    Ok(buffer)
}

/// AES-256-GCM via the `aes-gcm` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmAead;

impl AeadPrimitive for AesGcmAead {
    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        seal_detached::<Aes256Gcm>(key, nonce, aad, plaintext)
    }

    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>> {
        open_detached::<Aes256Gcm>(key, nonce, aad, ciphertext, tag)
    }
}

/// ChaCha20-Poly1305 via the `chacha20poly1305` crate.
/// Containers do not record the cipher; open them with the one that sealed them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20Aead;

impl AeadPrimitive for ChaCha20Aead {
    fn name(&self) -> &'static str {
        "chacha20-poly1305"
    }

    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        seal_detached::<ChaCha20Poly1305>(key, nonce, aad, plaintext)
    }

    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>> {
        open_detached::<ChaCha20Poly1305>(key, nonce, aad, ciphertext, tag)
    }
}

/// Instrumented primitive for tests.
///
/// Delegates to an inner primitive, records the nonce and AAD of every
/// `seal`/`open` call, and can be armed to fail `seal` after a number of
/// successful calls.
#[derive(Debug)]
pub struct TestAead<A = AesGcmAead> {
    inner: A,
    sealed: Mutex<Vec<([u8; NONCE_LEN], Vec<u8>)>>,
    opened: Mutex<Vec<[u8; NONCE_LEN]>>,
    seal_budget: AtomicUsize,
}

impl TestAead<AesGcmAead> {
    pub fn new() -> Self {
        Self::wrap(AesGcmAead)
    }
}

impl Default for TestAead<AesGcmAead> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AeadPrimitive> TestAead<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            sealed: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            seal_budget: AtomicUsize::new(usize::MAX),
        }
    }

    /// Let `calls` seals succeed, then fail every later one
    pub fn fail_seal_after(self, calls: usize) -> Self {
        self.seal_budget.store(calls, Ordering::SeqCst);
        self
    }

    /// Nonces passed to `seal`, in call order
    pub fn sealed_nonces(&self) -> Vec<[u8; NONCE_LEN]> {
        lock(&self.sealed).iter().map(|(n, _)| *n).collect()
    }

    /// AAD passed to `seal`, in call order
    pub fn sealed_aad(&self) -> Vec<Vec<u8>> {
        lock(&self.sealed).iter().map(|(_, a)| a.clone()).collect()
    }

    /// Nonces passed to `open`, in call order
    pub fn opened_nonces(&self) -> Vec<[u8; NONCE_LEN]> {
        lock(&self.opened).clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<A: AeadPrimitive> AeadPrimitive for TestAead<A> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        let budget = self.seal_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return Err(CryptError::internal("injected seal failure"));
        }
        if budget != usize::MAX {
            self.seal_budget.store(budget - 1, Ordering::SeqCst);
        }

        lock(&self.sealed).push((*nonce, aad.to_vec()));
        self.inner.seal(key, nonce, aad, plaintext)
    }

    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>> {
        lock(&self.opened).push(*nonce);
        self.inner.open(key, nonce, aad, ciphertext, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [0x42; KEY_LEN];
    const NONCE: [u8; NONCE_LEN] = [7; NONCE_LEN];

    fn primitives() -> Vec<Box<dyn AeadPrimitive>> {
        vec![Box::new(AesGcmAead), Box::new(ChaCha20Aead)]
    }

    #[test]
    fn test_seal_open_round_trip() {
        for aead in primitives() {
            let (ct, tag) = aead.seal(&KEY, &NONCE, b"aad", b"hello chunk").unwrap();
            assert_eq!(ct.len(), b"hello chunk".len(), "{}", aead.name());
            let pt = aead.open(&KEY, &NONCE, b"aad", &ct, &tag).unwrap();
            assert_eq!(pt.as_slice(), b"hello chunk");
        }
    }

    #[test]
    fn test_empty_plaintext_still_tagged() {
        for aead in primitives() {
            let (ct, tag) = aead.seal(&KEY, &NONCE, b"aad", b"").unwrap();
            assert!(ct.is_empty());
            assert!(aead.open(&KEY, &NONCE, b"other", &ct, &tag).is_err());
        }
    }

    #[test]
    fn test_open_fails_closed() {
        for aead in primitives() {
            let (ct, tag) = aead.seal(&KEY, &NONCE, b"aad", b"secret data").unwrap();

            let mut bad_ct = ct.clone();
            bad_ct[0] ^= 0x01;
            let mut bad_tag = tag;
            bad_tag[15] ^= 0x80;
            let mut bad_nonce = NONCE;
            bad_nonce[11] ^= 0x01;
            let mut bad_key = KEY;
            bad_key[0] ^= 0x01;

            let attempts = [
                aead.open(&KEY, &NONCE, b"aad", &bad_ct, &tag),
                aead.open(&KEY, &NONCE, b"aad", &ct, &bad_tag),
                aead.open(&KEY, &bad_nonce, b"aad", &ct, &tag),
                aead.open(&bad_key, &NONCE, b"aad", &ct, &tag),
                aead.open(&KEY, &NONCE, b"aae", &ct, &tag),
            ];
            for result in attempts {
                assert!(matches!(result, Err(CryptError::AuthenticationFailed)));
            }
        }
    }

    #[test]
    fn test_ciphers_not_interchangeable() {
        let (ct, tag) = AesGcmAead.seal(&KEY, &NONCE, b"", b"payload").unwrap();
        assert!(ChaCha20Aead.open(&KEY, &NONCE, b"", &ct, &tag).is_err());
    }

    #[test]
    fn test_recording_and_injected_failure() {
        let aead = TestAead::new().fail_seal_after(2);
        let n1 = [1u8; NONCE_LEN];
        let n2 = [2u8; NONCE_LEN];

        let (ct, tag) = aead.seal(&KEY, &n1, b"a", b"x").unwrap();
        aead.seal(&KEY, &n2, b"b", b"y").unwrap();
        assert!(matches!(
            aead.seal(&KEY, &n2, b"c", b"z"),
            Err(CryptError::Internal(_))
        ));
        aead.open(&KEY, &n1, b"a", &ct, &tag).unwrap();

        assert_eq!(aead.sealed_nonces(), vec![n1, n2]);
        assert_eq!(aead.sealed_aad(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(aead.opened_nonces(), vec![n1]);
    }
}
