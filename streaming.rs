//! Streaming encryption and decryption of containers.
//!
//! [`StreamEncryptor`] runs one operation end to end over any
//! `AsyncRead`/`AsyncWrite` pair. The per-operation state lives in an
//! explicit [`StreamingEngine`] value:
//!
//! ```text
//! Init -> DeriveKey -> ProcessChunk(0) -> ... -> ProcessChunk(n-1) -> Finalize -> Done
//!                 \__________________________________________________________/
//!                                     any error or cancel -> Failed
//! ```
//!
//! Chunks are processed strictly in index order on the calling task, so at
//! most one chunk of plaintext is in memory. On decryption nothing is written
//! for a chunk until its tag has verified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::aead::AeadPrimitive;
use crate::container::{chunk_aad, ChunkRecord, Header, HEADER_LEN};
use crate::error::{CryptError, Result};
use crate::kdf::{derive_key, KdfParams, SecretKey, KEY_LEN, SALT_LEN};
use crate::nonce::nonce_for;

/// Cooperative cancellation flag, checked once per chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional progress callback and cancel token for one operation.
///
/// The callback runs synchronously on the operation's task with the
/// fraction of plaintext processed so far, once per chunk.
#[derive(Default)]
pub struct Hooks<'a> {
    progress: Option<&'a mut (dyn FnMut(f32) + Send)>,
    cancel: Option<CancelToken>,
}

impl<'a> Hooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: &'a mut (dyn FnMut(f32) + Send)) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn report(&mut self, fraction: f32) {
        if let Some(callback) = self.progress.as_mut() {
            callback(fraction);
        }
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(CryptError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    DeriveKey,
    ProcessChunk(u32),
    Finalize,
    Done,
    Failed,
}

/// State of one encrypt or decrypt operation.
///
/// Owns the derived key for the duration of chunk processing; the key is
/// wiped as soon as the engine reaches `Done` or `Failed`, or is dropped.
pub struct StreamingEngine<'a, A: AeadPrimitive + ?Sized> {
    aead: &'a A,
    direction: Direction,
    header: Header,
    header_bytes: [u8; HEADER_LEN],
    chunk_count: u64,
    key: Option<SecretKey>,
    index: u64,
    bytes_processed: u64,
    state: EngineState,
}

impl<'a, A: AeadPrimitive + ?Sized> StreamingEngine<'a, A> {
    pub fn new(aead: &'a A, header: Header, direction: Direction) -> Result<Self> {
        Ok(Self {
            aead,
            direction,
            header_bytes: header.encode(),
            chunk_count: header.chunk_count()?,
            header,
            key: None,
            index: 0,
            bytes_processed: 0,
            state: EngineState::Init,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Index of the next chunk to process
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Fraction of the declared plaintext processed, in [0.0, 1.0]
    pub fn progress(&self) -> f32 {
        if self.header.plaintext_len == 0 {
            return if self.index >= self.chunk_count { 1.0 } else { 0.0 };
        }
        let fraction = self.bytes_processed as f64 / self.header.plaintext_len as f64;
        fraction.min(1.0) as f32
    }

    /// Derive the key from `password` and the header salt, off the async executor
    pub async fn derive_key(&mut self, password: &[u8], params: &KdfParams) -> Result<()> {
        self.expect_state(EngineState::Init)?;
        self.state = EngineState::DeriveKey;

        let password = Zeroizing::new(password.to_vec());
        let salt: [u8; SALT_LEN] = self.header.salt;
        let params = *params;
        let derived = tokio::task::spawn_blocking(move || derive_key(&password, &salt, &params))
            .await
            .map_err(|e| CryptError::internal(format!("key derivation task failed: {}", e)));

        match derived.and_then(|key| key) {
            Ok(key) => {
                self.install(key);
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    /// Use an already-derived key, skipping the KDF
    pub fn with_key(mut self, key: SecretKey) -> Result<Self> {
        self.expect_state(EngineState::Init)?;
        self.install(key);
        Ok(self)
    }

    fn install(&mut self, key: SecretKey) {
        self.key = Some(key);
        self.state = EngineState::ProcessChunk(0);
    }

    fn expect_state(&self, expected: EngineState) -> Result<()> {
        if self.state != expected {
            return Err(CryptError::internal(format!(
                "engine in state {:?}, expected {:?}",
                self.state, expected
            )));
        }
        Ok(())
    }

    /// Index and final flag of the chunk about to be processed
    fn begin_chunk(&self, direction: Direction) -> Result<(u32, bool)> {
        if self.direction != direction {
            return Err(CryptError::internal(format!(
                "{:?} engine cannot process a {:?} chunk",
                self.direction, direction
            )));
        }
        let index = u32::try_from(self.index)
            .map_err(|_| CryptError::internal("chunk index overflow"))?;
        self.expect_state(EngineState::ProcessChunk(index))?;
        Ok((index, self.header.is_final_chunk(self.index)?))
    }

    fn advance(&mut self, plaintext_len: usize) {
        self.bytes_processed += plaintext_len as u64;
        self.index += 1;
        self.state = if self.index == self.chunk_count {
            EngineState::Finalize
        } else {
            // chunk_count <= 2^32, so every pending index fits in u32
            EngineState::ProcessChunk(self.index as u32)
        };
    }

    fn key(&self) -> Result<&[u8; KEY_LEN]> {
        self.key
            .as_ref()
            .map(|key| &**key)
            .ok_or_else(|| CryptError::internal("no key installed"))
    }

    /// Seal the next chunk into a record
    pub fn seal_chunk(&mut self, plaintext: &[u8]) -> Result<ChunkRecord> {
        let (index, is_final) = self.begin_chunk(Direction::Encrypt)?;
        let expected = self.header.chunk_len(self.index)?;
        if plaintext.len() != expected {
            return Err(CryptError::internal(format!(
                "chunk {} is {} bytes, expected {}",
                index,
                plaintext.len(),
                expected
            )));
        }

        let nonce = nonce_for(&self.header.base_nonce, index);
        let aad = chunk_aad(&self.header_bytes, index, is_final);
        let (ciphertext, tag) = self.aead.seal(self.key()?, &nonce, &aad, plaintext)?;

        self.advance(plaintext.len());
        Ok(ChunkRecord { ciphertext, tag })
    }

    /// Verify and decrypt the next record
    pub fn open_chunk(&mut self, record: &ChunkRecord) -> Result<Zeroizing<Vec<u8>>> {
        let (index, is_final) = self.begin_chunk(Direction::Decrypt)?;

        let nonce = nonce_for(&self.header.base_nonce, index);
        let aad = chunk_aad(&self.header_bytes, index, is_final);
        let plaintext = self
            .aead
            .open(self.key()?, &nonce, &aad, &record.ciphertext, &record.tag)
            .map_err(|e| {
                warn!(chunk = index, "chunk failed authentication");
                e
            })?;

        self.advance(plaintext.len());
        Ok(plaintext)
    }

    /// Check the reconstructed length and wipe the key
    pub fn finalize(&mut self) -> Result<u64> {
        let complete = self.state == EngineState::Finalize;
        let result = if self.bytes_processed != self.header.plaintext_len || !complete {
            Err(CryptError::data_corrupted(format!(
                "reconstructed {} of {} declared bytes ({} of {} chunks)",
                self.bytes_processed, self.header.plaintext_len, self.index, self.chunk_count
            )))
        } else {
            Ok(self.bytes_processed)
        };

        self.key = None;
        self.state = if result.is_ok() {
            EngineState::Done
        } else {
            EngineState::Failed
        };
        result
    }

    /// Abandon the operation and wipe the key
    pub fn fail(&mut self) {
        self.key = None;
        self.state = EngineState::Failed;
    }

    /// Encrypt `reader` (exactly `plaintext_len` bytes) into chunk records on `writer`.
    /// The header must already have been written.
    pub async fn encrypt<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.run_encrypt(reader, writer, hooks).await;
        if result.is_err() {
            self.fail();
        }
        result
    }

    async fn run_encrypt<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = Zeroizing::new(Vec::new());

        while self.index < self.chunk_count {
            hooks.check_cancel()?;

            let len = self.header.chunk_len(self.index)?;
            buffer.resize(len, 0);
            reader.read_exact(&mut buffer[..]).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    CryptError::Io(std::io::Error::new(
                        e.kind(),
                        "source ended before its declared length",
                    ))
                } else {
                    e.into()
                }
            })?;

            let record = self.seal_chunk(&buffer)?;
            record.write_to(writer).await?;
            debug!(chunk = self.index - 1, bytes = len, "chunk sealed");

            hooks.report(self.progress());
        }

        // The declared length must cover the whole source
        let mut probe = [0u8; 1];
        if reader.read(&mut probe).await? != 0 {
            return Err(CryptError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "source is longer than its declared length",
            )));
        }

        writer.flush().await?;
        self.finalize()
    }

    /// Decrypt the chunk records following the header from `reader` into `writer`
    pub async fn decrypt<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.run_decrypt(reader, writer, hooks).await;
        if result.is_err() {
            self.fail();
        }
        result
    }

    async fn run_decrypt<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while self.index < self.chunk_count {
            hooks.check_cancel()?;

            let expected = self.header.chunk_len(self.index)?;
            let record = match ChunkRecord::read_from(reader, expected).await? {
                Some(record) => record,
                None => {
                    warn!(
                        chunk = self.index,
                        chunks = self.chunk_count,
                        "container ended early"
                    );
                    break;
                }
            };

            let plaintext = self.open_chunk(&record)?;
            writer.write_all(&plaintext).await?;
            debug!(chunk = self.index - 1, bytes = plaintext.len(), "chunk opened");

            hooks.report(self.progress());
        }

        let mut probe = [0u8; 1];
        if reader.read(&mut probe).await? != 0 {
            return Err(CryptError::data_corrupted(
                "trailing data after the final chunk record",
            ));
        }

        writer.flush().await?;
        self.finalize()
    }
}

/// Runs whole encrypt/decrypt operations with one AEAD primitive and KDF setting.
pub struct StreamEncryptor<A> {
    aead: A,
    kdf: KdfParams,
}

impl<A: AeadPrimitive> StreamEncryptor<A> {
    pub fn new(aead: A, kdf: KdfParams) -> Self {
        Self { aead, kdf }
    }

    pub fn aead(&self) -> &A {
        &self.aead
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn set_kdf_params(&mut self, kdf: KdfParams) {
        self.kdf = kdf;
    }

    /// Encrypt `header.plaintext_len` bytes from `reader` into a container on `writer`.
    /// Returns the number of plaintext bytes encrypted.
    pub async fn encrypt_stream<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        password: &[u8],
        header: Header,
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut engine = StreamingEngine::new(&self.aead, header, Direction::Encrypt)?;
        header.write_to(writer).await?;
        engine.derive_key(password, &self.kdf).await?;

        let bytes = engine.encrypt(reader, writer, hooks).await?;
        info!(
            bytes,
            chunks = engine.index(),
            cipher = self.aead.name(),
            "stream encrypted"
        );
        Ok(bytes)
    }

    /// Read a container from `reader` and write the verified plaintext to `writer`.
    /// Returns the number of plaintext bytes recovered.
    pub async fn decrypt_stream<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        password: &[u8],
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let header = Header::read_from(reader).await?;
        self.decrypt_records(header, reader, writer, password, hooks)
            .await
    }

    /// Decrypt the records that follow an already-parsed `header`
    pub async fn decrypt_records<R, W>(
        &self,
        header: Header,
        reader: &mut R,
        writer: &mut W,
        password: &[u8],
        hooks: &mut Hooks<'_>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut engine = StreamingEngine::new(&self.aead, header, Direction::Decrypt)?;
        engine.derive_key(password, &self.kdf).await?;

        let bytes = engine.decrypt(reader, writer, hooks).await?;
        info!(
            bytes,
            chunks = engine.index(),
            cipher = self.aead.name(),
            "stream decrypted"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::{AesGcmAead, TestAead};
    use crate::container::{FileSeed, RECORD_OVERHEAD};
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn seed() -> FileSeed {
        FileSeed {
            salt: [5u8; SALT_LEN],
            base_nonce: [9u8; 8],
        }
    }

    fn fast_kdf() -> KdfParams {
        KdfParams::new(256, 1, 1)
    }

    fn key() -> SecretKey {
        Zeroizing::new([0x42u8; KEY_LEN])
    }

    #[test]
    fn test_engine_state_machine() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 4, 10).unwrap();
        let engine = StreamingEngine::new(&aead, header, Direction::Encrypt).unwrap();
        assert_eq!(engine.state(), EngineState::Init);

        let mut engine = engine.with_key(key()).unwrap();
        assert_eq!(engine.state(), EngineState::ProcessChunk(0));

        engine.seal_chunk(b"abcd").unwrap();
        assert_eq!(engine.state(), EngineState::ProcessChunk(1));
        assert_eq!(engine.bytes_processed(), 4);
        engine.seal_chunk(b"efgh").unwrap();
        let last = engine.seal_chunk(b"ij").unwrap();
        assert_eq!(last.ciphertext.len(), 2);
        assert_eq!(engine.state(), EngineState::Finalize);

        assert_eq!(engine.finalize().unwrap(), 10);
        assert_eq!(engine.state(), EngineState::Done);
        assert!(!engine.has_key());
    }

    #[test]
    fn test_seal_rejects_wrong_chunk_length_and_direction() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 4, 10).unwrap();
        let mut engine = StreamingEngine::new(&aead, header, Direction::Encrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        assert_eq!(engine.seal_chunk(b"abc").unwrap_err().kind(), ErrorKind::Internal);

        let record = engine.seal_chunk(b"abcd").unwrap();
        assert_eq!(engine.open_chunk(&record).unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_processing_without_key_fails() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 4, 4).unwrap();
        let mut engine = StreamingEngine::new(&aead, header, Direction::Encrypt).unwrap();
        assert_eq!(engine.seal_chunk(b"abcd").unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_open_in_order_and_reordered_records_fail() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 4, 8).unwrap();
        let mut enc = StreamingEngine::new(&aead, header, Direction::Encrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        let r0 = enc.seal_chunk(b"aaaa").unwrap();
        let r1 = enc.seal_chunk(b"bbbb").unwrap();

        let mut dec = StreamingEngine::new(&aead, header, Direction::Decrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        assert_eq!(dec.open_chunk(&r0).unwrap().as_slice(), b"aaaa");
        assert_eq!(dec.open_chunk(&r1).unwrap().as_slice(), b"bbbb");
        dec.finalize().unwrap();

        // Swapped records carry the wrong index in nonce and AAD
        let mut dec = StreamingEngine::new(&aead, header, Direction::Decrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        assert_eq!(
            dec.open_chunk(&r1).unwrap_err().kind(),
            ErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn test_finalize_detects_missing_chunks() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 4, 8).unwrap();
        let mut enc = StreamingEngine::new(&aead, header, Direction::Encrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        let r0 = enc.seal_chunk(b"aaaa").unwrap();

        let mut dec = StreamingEngine::new(&aead, header, Direction::Decrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        dec.open_chunk(&r0).unwrap();
        assert_eq!(dec.finalize().unwrap_err().kind(), ErrorKind::DataCorrupted);
        assert_eq!(dec.state(), EngineState::Failed);
        assert!(!dec.has_key());
    }

    #[test]
    fn test_progress_for_empty_plaintext() {
        let aead = AesGcmAead;
        let header = Header::new(&seed(), 16, 0).unwrap();
        let mut engine = StreamingEngine::new(&aead, header, Direction::Encrypt)
            .unwrap()
            .with_key(key())
            .unwrap();
        assert_eq!(engine.progress(), 0.0);
        engine.seal_chunk(b"").unwrap();
        assert_eq!(engine.progress(), 1.0);
    }

    #[tokio::test]
    async fn test_stream_round_trip_and_nonces() {
        let aead = TestAead::new();
        let enc = StreamEncryptor::new(&aead, fast_kdf());

        let plaintext = vec![0x5Au8; 100];
        let header = Header::new(&seed(), 16, plaintext.len() as u64).unwrap();
        let mut container = Vec::new();
        let written = enc
            .encrypt_stream(
                &mut Cursor::new(plaintext.clone()),
                &mut container,
                b"pw",
                header,
                &mut Hooks::new(),
            )
            .await
            .unwrap();
        assert_eq!(written, 100);
        assert_eq!(container.len(), HEADER_LEN + 7 * RECORD_OVERHEAD + 100);

        let expected: Vec<_> = (0..7u32).map(|i| nonce_for(&seed().base_nonce, i)).collect();
        assert_eq!(aead.sealed_nonces(), expected);

        let mut out = Vec::new();
        enc.decrypt_stream(&mut Cursor::new(container), &mut out, b"pw", &mut Hooks::new())
            .await
            .unwrap();
        assert_eq!(out, plaintext);
        assert_eq!(aead.opened_nonces(), expected);
    }

    #[tokio::test]
    async fn test_stream_truncated_last_record() {
        let enc = StreamEncryptor::new(AesGcmAead, fast_kdf());
        let header = Header::new(&seed(), 16, 40).unwrap();
        let mut container = Vec::new();
        enc.encrypt_stream(
            &mut Cursor::new(vec![1u8; 40]),
            &mut container,
            b"pw",
            header,
            &mut Hooks::new(),
        )
        .await
        .unwrap();

        // Drop the final 8-byte record
        container.truncate(container.len() - (RECORD_OVERHEAD + 8));
        let mut out = Vec::new();
        let err = enc
            .decrypt_stream(&mut Cursor::new(container), &mut out, b"pw", &mut Hooks::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataCorrupted);
    }

    #[tokio::test]
    async fn test_stream_trailing_data_rejected() {
        let enc = StreamEncryptor::new(AesGcmAead, fast_kdf());
        let header = Header::new(&seed(), 16, 5).unwrap();
        let mut container = Vec::new();
        enc.encrypt_stream(
            &mut Cursor::new(b"hello".to_vec()),
            &mut container,
            b"pw",
            header,
            &mut Hooks::new(),
        )
        .await
        .unwrap();

        container.extend_from_slice(b"junk");
        let err = enc
            .decrypt_stream(
                &mut Cursor::new(container),
                &mut Vec::new(),
                b"pw",
                &mut Hooks::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataCorrupted);
    }

    #[tokio::test]
    async fn test_source_length_must_match_header() {
        let enc = StreamEncryptor::new(AesGcmAead, fast_kdf());

        let short = Header::new(&seed(), 16, 10).unwrap();
        let err = enc
            .encrypt_stream(
                &mut Cursor::new(vec![0u8; 4]),
                &mut Vec::new(),
                b"pw",
                short,
                &mut Hooks::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let long = Header::new(&seed(), 16, 2).unwrap();
        let err = enc
            .encrypt_stream(
                &mut Cursor::new(vec![0u8; 4]),
                &mut Vec::new(),
                b"pw",
                long,
                &mut Hooks::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_cancel_before_first_chunk() {
        let enc = StreamEncryptor::new(AesGcmAead, fast_kdf());
        let header = Header::new(&seed(), 16, 40).unwrap();
        let token = CancelToken::new();
        token.cancel();

        let mut out = Vec::new();
        let err = enc
            .encrypt_stream(
                &mut Cursor::new(vec![0u8; 40]),
                &mut out,
                b"pw",
                header,
                &mut Hooks::new().with_cancel(token),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        // Only the header made it out
        assert_eq!(out.len(), HEADER_LEN);
    }

    #[tokio::test]
    async fn test_progress_reported_per_chunk() {
        let enc = StreamEncryptor::new(AesGcmAead, fast_kdf());
        let header = Header::new(&seed(), 10, 40).unwrap();

        let mut seen = Vec::new();
        let mut record = |p: f32| seen.push(p);
        enc.encrypt_stream(
            &mut Cursor::new(vec![0u8; 40]),
            &mut Vec::new(),
            b"pw",
            header,
            &mut Hooks::new().on_progress(&mut record),
        )
        .await
        .unwrap();

        assert_eq!(seen, vec![0.25, 0.5, 0.75, 1.0]);
    }
}
