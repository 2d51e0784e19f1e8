//! High-level password-based file and buffer encryption.
//!
//! This module provides [`Encryptor`], the entry point for callers (CLI,
//! GUI, tests). Every operation runs the same chunked pipeline from
//! [`crate::streaming`]; the in-memory variants frame their output exactly
//! like the file variants.
//!
//! ## Failure semantics
//!
//! - The source file is never modified
//! - A failed or cancelled operation removes the partial destination file
//! - A wrong password surfaces as a single `AuthenticationFailed`

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::BufWriter;
use tracing::{debug, error, info, warn};
use zeroize::Zeroize;

use crate::aead::{AeadPrimitive, AesGcmAead};
use crate::config::Config;
use crate::container::{FileSeed, Header, DEFAULT_CHUNK_SIZE};
use crate::error::{CryptError, Result};
use crate::kdf::KdfParams;
use crate::streaming::{Hooks, StreamEncryptor};

pub const ENCRYPTED_EXTENSION: &str = "encrypted";
pub const DECRYPTED_EXTENSION: &str = "decrypted";

pub struct Encryptor<A = AesGcmAead> {
    stream: StreamEncryptor<A>,
    chunk_size: u32,
}

impl Encryptor<AesGcmAead> {
    /// AES-256-GCM, default Argon2id parameters, 8 MiB chunks
    pub fn new() -> Self {
        Self::with_aead(AesGcmAead)
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut encryptor = Self::new().with_kdf_params(cfg.kdf);
        encryptor.set_chunk_size(cfg.chunk_size as usize)?;
        Ok(encryptor)
    }
}

impl Default for Encryptor<AesGcmAead> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AeadPrimitive> Encryptor<A> {
    pub fn with_aead(aead: A) -> Self {
        Self {
            stream: StreamEncryptor::new(aead, KdfParams::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.stream.set_kdf_params(kdf);
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Result<Self> {
        self.set_chunk_size(bytes)?;
        Ok(self)
    }

    /// Set the plaintext chunk size used for new containers.
    /// Must fit the 4-byte record length prefix.
    pub fn set_chunk_size(&mut self, bytes: usize) -> Result<()> {
        let size = u32::try_from(bytes)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| {
                CryptError::invalid_params(format!(
                    "chunk size must be between 1 and {} bytes, got {}",
                    u32::MAX,
                    bytes
                ))
            })?;
        debug!(chunk_size = size, "chunk size set");
        self.chunk_size = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn kdf_params(&self) -> &KdfParams {
        self.stream.kdf_params()
    }

    pub fn aead(&self) -> &A {
        self.stream.aead()
    }

    pub async fn encrypt_file(&self, src: &Path, dst: &Path, password: &[u8]) -> Result<u64> {
        self.encrypt_file_with(src, dst, password, Hooks::new()).await
    }

    /// Encrypt `src` into a new container at `dst`, reporting progress and
    /// honouring cancellation through `hooks`. Returns the plaintext length.
    pub async fn encrypt_file_with(
        &self,
        src: &Path,
        dst: &Path,
        password: &[u8],
        mut hooks: Hooks<'_>,
    ) -> Result<u64> {
        let plaintext_len = check_source(src).await?;
        check_distinct(src, dst).await?;
        info!(src = %src.display(), dst = %dst.display(), bytes = plaintext_len, "encrypting file");

        let header = Header::new(&FileSeed::random(), self.chunk_size, plaintext_len)?;
        let mut reader = fs::File::open(src).await?;

        let file = fs::File::create(dst).await?;
        let mut writer = BufWriter::new(file);
        let result = self
            .stream
            .encrypt_stream(&mut reader, &mut writer, password, header, &mut hooks)
            .await;

        finish_output(dst, writer, result).await
    }

    pub async fn decrypt_file(&self, src: &Path, dst: &Path, password: &[u8]) -> Result<u64> {
        self.decrypt_file_with(src, dst, password, Hooks::new()).await
    }

    /// Decrypt the container at `src` into `dst`. Returns the plaintext length.
    pub async fn decrypt_file_with(
        &self,
        src: &Path,
        dst: &Path,
        password: &[u8],
        mut hooks: Hooks<'_>,
    ) -> Result<u64> {
        let container_len = check_source(src).await?;
        check_distinct(src, dst).await?;
        info!(src = %src.display(), dst = %dst.display(), "decrypting file");

        let mut reader = fs::File::open(src).await?;
        let header = Header::read_from(&mut reader).await?;
        check_container_len(&header, container_len)?;

        let file = fs::File::create(dst).await?;
        let mut writer = BufWriter::new(file);
        let result = self
            .stream
            .decrypt_records(header, &mut reader, &mut writer, password, &mut hooks)
            .await;

        finish_output(dst, writer, result).await
    }

    /// Encrypt an in-memory buffer into a complete container
    pub async fn encrypt_bytes(&self, data: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_bytes_seeded(data, password, FileSeed::random())
            .await
    }

    /// Like [`Encryptor::encrypt_bytes`] with caller-supplied salt and base
    /// nonce. A seed must never be reused for real data.
    pub async fn encrypt_bytes_seeded(
        &self,
        data: &[u8],
        password: &[u8],
        seed: FileSeed,
    ) -> Result<Vec<u8>> {
        let header = Header::new(&seed, self.chunk_size, data.len() as u64)?;
        let capacity = usize::try_from(header.expected_container_len()?).unwrap_or(0);
        let mut out = Vec::with_capacity(capacity);

        let mut reader = data;
        self.stream
            .encrypt_stream(&mut reader, &mut out, password, header, &mut Hooks::new())
            .await?;
        Ok(out)
    }

    /// Decrypt a complete in-memory container.
    /// On failure no plaintext is returned and the partial buffer is wiped.
    pub async fn decrypt_bytes(&self, data: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        let mut reader = data;
        let header = Header::read_from(&mut reader).await?;
        check_container_len(&header, data.len() as u64)?;

        // exact size: the plaintext buffer must never reallocate
        let capacity = usize::try_from(header.plaintext_len).map_err(|_| {
            CryptError::invalid_params("declared plaintext does not fit in memory")
        })?;
        let mut out = Vec::with_capacity(capacity);
        match self
            .stream
            .decrypt_records(header, &mut reader, &mut out, password, &mut Hooks::new())
            .await
        {
            Ok(_) => Ok(out),
            Err(e) => {
                out.zeroize();
                Err(e)
            }
        }
    }
}

/// Default destination for `src`.
///
/// Encrypting appends `.encrypted`; decrypting strips a trailing
/// `.encrypted`, or appends `.decrypted` when there is none.
pub fn default_output_path(src: &Path, encrypting: bool) -> PathBuf {
    let mut name = src.as_os_str().to_owned();
    if encrypting {
        name.push(".");
        name.push(ENCRYPTED_EXTENSION);
        return PathBuf::from(name);
    }

    let has_stem = src.file_stem().map_or(false, |stem| !stem.is_empty());
    if src.extension().and_then(|e| e.to_str()) == Some(ENCRYPTED_EXTENSION) && has_stem {
        return src.with_extension("");
    }
    name.push(".");
    name.push(DECRYPTED_EXTENSION);
    PathBuf::from(name)
}

/// Length of `src`, which must be an existing regular file
async fn check_source(src: &Path) -> Result<u64> {
    let meta = fs::metadata(src).await.map_err(|e| {
        CryptError::file_operation(format!("cannot access source {}: {}", src.display(), e))
    })?;
    if !meta.is_file() {
        return Err(CryptError::file_operation(format!(
            "source is not a regular file: {}",
            src.display()
        )));
    }
    Ok(meta.len())
}

/// Refuse a destination that is the source itself; truncating it would destroy the input
async fn check_distinct(src: &Path, dst: &Path) -> Result<()> {
    let exists = fs::try_exists(dst).await.map_err(|e| {
        CryptError::file_operation(format!("cannot access destination {}: {}", dst.display(), e))
    })?;
    if !exists {
        return Ok(());
    }
    let src_real = fs::canonicalize(src).await?;
    let dst_real = fs::canonicalize(dst).await?;
    if src_real == dst_real {
        return Err(CryptError::file_operation(format!(
            "destination is the source file: {}",
            dst.display()
        )));
    }
    Ok(())
}

fn check_container_len(header: &Header, actual: u64) -> Result<()> {
    let expected = header.expected_container_len()?;
    if actual != expected {
        return Err(CryptError::data_corrupted(format!(
            "container is {} bytes, header implies {}",
            actual, expected
        )));
    }
    Ok(())
}

/// Sync the destination on success; remove it on any failure
async fn finish_output(dst: &Path, writer: BufWriter<fs::File>, result: Result<u64>) -> Result<u64> {
    let result = match result {
        Ok(bytes) => writer
            .into_inner()
            .sync_all()
            .await
            .map(|_| bytes)
            .map_err(CryptError::from),
        Err(e) => {
            drop(writer);
            Err(e)
        }
    };

    match result {
        Ok(bytes) => {
            info!(dst = %dst.display(), bytes, "operation complete");
            Ok(bytes)
        }
        Err(e) => {
            error!(dst = %dst.display(), error = %e, "operation failed, removing partial output");
            if let Err(rm) = fs::remove_file(dst).await {
                warn!(dst = %dst.display(), error = %rm, "could not remove partial output");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_set_chunk_size_bounds() {
        let mut enc = Encryptor::new();
        assert_eq!(enc.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(enc.set_chunk_size(0).unwrap_err().kind(), ErrorKind::InvalidParams);
        enc.set_chunk_size(4096).unwrap();
        assert_eq!(enc.chunk_size(), 4096);
        enc.set_chunk_size(u32::MAX as usize).unwrap();
        #[cfg(target_pointer_width = "64")]
        assert!(enc.set_chunk_size(u32::MAX as usize + 1).is_err());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/report.pdf"), true),
            PathBuf::from("/tmp/report.pdf.encrypted")
        );
        assert_eq!(
            default_output_path(Path::new("/tmp/report.pdf.encrypted"), false),
            PathBuf::from("/tmp/report.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("/tmp/report.bin"), false),
            PathBuf::from("/tmp/report.bin.decrypted")
        );
        assert_eq!(
            default_output_path(Path::new("/tmp/.encrypted"), false),
            PathBuf::from("/tmp/.encrypted.decrypted")
        );
    }

    #[test]
    fn test_from_config() {
        let cfg = Config::new(1024, KdfParams::new(256, 1, 1));
        let enc = Encryptor::from_config(&cfg).unwrap();
        assert_eq!(enc.chunk_size(), 1024);
        assert_eq!(*enc.kdf_params(), KdfParams::new(256, 1, 1));
    }

    #[tokio::test]
    async fn test_decrypt_bytes_output_never_reallocates() {
        let enc = Encryptor::new()
            .with_kdf_params(KdfParams::new(256, 1, 1))
            .with_chunk_size(64)
            .unwrap();
        let data: Vec<u8> = (0..10 * 64 + 17).map(|i| i as u8).collect();
        let container = enc.encrypt_bytes(&data, b"pw").await.unwrap();

        let out = enc.decrypt_bytes(&container, b"pw").await.unwrap();
        assert_eq!(out, data);
        assert_eq!(out.capacity(), data.len());
    }

    #[tokio::test]
    async fn test_unreadable_destination_is_file_operation() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("plain.bin");
        std::fs::write(&src, b"payload").unwrap();

        // a path below a regular file cannot be stat'ed
        let dst = src.join("out.encrypted");
        let err = check_distinct(&src, &dst).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileOperation);
    }

    #[tokio::test]
    async fn test_decrypt_bytes_rejects_length_mismatch_before_kdf() {
        let enc = Encryptor::new()
            .with_kdf_params(KdfParams::new(256, 1, 1))
            .with_chunk_size(16)
            .unwrap();
        let mut container = enc.encrypt_bytes(b"some bytes", b"pw").await.unwrap();
        container.push(0);
        let err = enc.decrypt_bytes(&container, b"pw").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataCorrupted);
    }
}
