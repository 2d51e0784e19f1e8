//! On-disk container format.
//!
//! ```text
//! Header (41 bytes, integers big-endian):
//!   [magic:4 "CRU1"][version:1][salt:16][base_nonce:8][chunk_size:4][plaintext_len:8]
//!
//! Chunk record (repeated, in index order):
//!   [ct_len:4][ciphertext:ct_len][tag:16]
//! ```
//!
//! A container always holds at least one record, so even an empty plaintext
//! carries a tag over the header. The record count and every `ct_len` are
//! fully determined by `chunk_size` and `plaintext_len`, which lets a reader
//! reject truncated or padded containers from the header alone.
//!
//! Each record is authenticated with the AAD produced by [`chunk_aad`]: the
//! encoded header, the chunk index and a final-chunk marker.

use rand_core::{OsRng, RngCore};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::aead::TAG_LEN;
use crate::error::{CryptError, Result};
use crate::kdf::SALT_LEN;
use crate::nonce::{random_base_nonce, BASE_NONCE_LEN};

pub const MAGIC: [u8; 4] = *b"CRU1";

/// Current container format version
pub const FORMAT_VERSION: u8 = 1;

pub const HEADER_LEN: usize = 4 + 1 + SALT_LEN + BASE_NONCE_LEN + 4 + 8;

/// Bytes a record adds on top of its ciphertext: length prefix + tag
pub const RECORD_OVERHEAD: usize = 4 + TAG_LEN;

/// Default chunk size (8 MiB)
pub const DEFAULT_CHUNK_SIZE: u32 = 8 * 1024 * 1024;

/// Chunk indices are `u32`, so a container holds at most 2^32 records
pub const MAX_CHUNKS: u64 = 1 << 32;

pub const AAD_LEN: usize = HEADER_LEN + 4 + 1;

/// Up-front ciphertext allocation when reading a record
const READ_AHEAD: usize = 64 * 1024;

/// Random per-file material: the KDF salt and the nonce base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSeed {
    pub salt: [u8; SALT_LEN],
    pub base_nonce: [u8; BASE_NONCE_LEN],
}

impl FileSeed {
    /// Fresh salt and base nonce from the OS RNG
    pub fn random() -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self {
            salt,
            base_nonce: random_base_nonce(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub salt: [u8; SALT_LEN],
    pub base_nonce: [u8; BASE_NONCE_LEN],
    pub chunk_size: u32,
    pub plaintext_len: u64,
}

impl Header {
    pub fn new(seed: &FileSeed, chunk_size: u32, plaintext_len: u64) -> Result<Self> {
        let header = Self {
            version: FORMAT_VERSION,
            salt: seed.salt,
            base_nonce: seed.base_nonce,
            chunk_size,
            plaintext_len,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CryptError::invalid_params("chunk size must be non-zero"));
        }
        self.chunk_count()?;
        self.expected_container_len()?;
        Ok(())
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut pos = 0;
        let mut put = |bytes: &[u8]| {
            out[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };
        put(&MAGIC);
        put(&[self.version]);
        put(&self.salt);
        put(&self.base_nonce);
        put(&self.chunk_size.to_be_bytes());
        put(&self.plaintext_len.to_be_bytes());
        out
    }

    /// Parse and validate a header (magic, version, chunk size)
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        if bytes[..4] != MAGIC {
            return Err(CryptError::invalid_params("not a CRU1 container (bad magic)"));
        }
        let version = bytes[4];
        if version != FORMAT_VERSION {
            return Err(CryptError::invalid_params(format!(
                "unsupported container version: {}",
                version
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[5..5 + SALT_LEN]);
        let mut base_nonce = [0u8; BASE_NONCE_LEN];
        base_nonce.copy_from_slice(&bytes[21..21 + BASE_NONCE_LEN]);

        let mut chunk_size = [0u8; 4];
        chunk_size.copy_from_slice(&bytes[29..33]);
        let mut plaintext_len = [0u8; 8];
        plaintext_len.copy_from_slice(&bytes[33..41]);

        let header = Self {
            version,
            salt,
            base_nonce,
            chunk_size: u32::from_be_bytes(chunk_size),
            plaintext_len: u64::from_be_bytes(plaintext_len),
        };
        // an impossible chunk count read from disk is a malformed header
        header.validate().map_err(|e| match e {
            CryptError::Internal(msg) => CryptError::InvalidParams(msg),
            other => other,
        })?;
        Ok(header)
    }

    /// Number of chunk records; an empty plaintext still gets one record
    pub fn chunk_count(&self) -> Result<u64> {
        if self.chunk_size == 0 {
            return Err(CryptError::invalid_params("chunk size must be non-zero"));
        }
        let size = u64::from(self.chunk_size);
        let count = (self.plaintext_len / size + u64::from(self.plaintext_len % size != 0)).max(1);
        if count > MAX_CHUNKS {
            return Err(CryptError::internal(format!(
                "{} chunks exceed the 32-bit chunk index",
                count
            )));
        }
        Ok(count)
    }

    /// Plaintext length of chunk `index` (only the last one may be short)
    pub fn chunk_len(&self, index: u64) -> Result<usize> {
        let count = self.chunk_count()?;
        if index >= count {
            return Err(CryptError::internal(format!(
                "chunk {} out of range ({} chunks)",
                index, count
            )));
        }
        let len = if index + 1 < count {
            u64::from(self.chunk_size)
        } else {
            self.plaintext_len - index * u64::from(self.chunk_size)
        };
        usize::try_from(len).map_err(|_| CryptError::internal("chunk does not fit in memory"))
    }

    pub fn is_final_chunk(&self, index: u64) -> Result<bool> {
        Ok(index + 1 == self.chunk_count()?)
    }

    /// Total container length implied by this header
    pub fn expected_container_len(&self) -> Result<u64> {
        let count = self.chunk_count()?;
        count
            .checked_mul(RECORD_OVERHEAD as u64)
            .and_then(|framing| framing.checked_add(HEADER_LEN as u64))
            .and_then(|len| len.checked_add(self.plaintext_len))
            .ok_or_else(|| CryptError::invalid_params("declared plaintext length too large"))
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await?;
        Ok(())
    }

    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = [0u8; HEADER_LEN];
        let n = read_full(reader, &mut bytes).await?;
        if n < HEADER_LEN {
            return Err(CryptError::invalid_params(format!(
                "truncated header: {} of {} bytes",
                n, HEADER_LEN
            )));
        }
        Self::decode(&bytes)
    }
}

/// One length-prefixed ciphertext plus its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl ChunkRecord {
    pub fn encoded_len(&self) -> usize {
        RECORD_OVERHEAD + self.ciphertext.len()
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let ct_len = u32::try_from(self.ciphertext.len())
            .map_err(|_| CryptError::internal("ciphertext exceeds 4-byte length prefix"))?;
        writer.write_u32(ct_len).await?;
        writer.write_all(&self.ciphertext).await?;
        writer.write_all(&self.tag).await?;
        Ok(())
    }

    /// Read the next record, expecting `expected_len` ciphertext bytes.
    ///
    /// Returns `Ok(None)` on a clean end of input at a record boundary. A
    /// partial record or a length prefix other than `expected_len` is
    /// `DataCorrupted`. The ciphertext buffer grows with the bytes actually
    /// received, so a huge declared length costs nothing on a short input.
    pub async fn read_from<R>(reader: &mut R, expected_len: usize) -> Result<Option<Self>>
    where
        R: AsyncRead + Unpin,
    {
        let mut prefix = [0u8; 4];
        match read_full(reader, &mut prefix).await? {
            0 => return Ok(None),
            4 => {}
            n => {
                return Err(CryptError::data_corrupted(format!(
                    "truncated record length prefix ({} of 4 bytes)",
                    n
                )))
            }
        }

        let ct_len = u32::from_be_bytes(prefix) as usize;
        if ct_len != expected_len {
            return Err(CryptError::data_corrupted(format!(
                "record length {} does not match expected {}",
                ct_len, expected_len
            )));
        }

        let mut ciphertext = Vec::with_capacity(ct_len.min(READ_AHEAD));
        (&mut *reader)
            .take(ct_len as u64)
            .read_to_end(&mut ciphertext)
            .await?;
        let mut tag = [0u8; TAG_LEN];
        if ciphertext.len() < ct_len || read_full(reader, &mut tag).await? < TAG_LEN {
            return Err(CryptError::data_corrupted("truncated chunk record"));
        }

        Ok(Some(Self { ciphertext, tag }))
    }
}

/// AAD for chunk `index`: `[header:41][index:4 BE][final:1]`.
///
/// Binding the header makes any header edit fail authentication; the
/// final marker stops a record from being replayed as the last one.
pub fn chunk_aad(header: &[u8; HEADER_LEN], index: u32, is_final: bool) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    aad[..HEADER_LEN].copy_from_slice(header);
    aad[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&index.to_be_bytes());
    aad[HEADER_LEN + 4] = u8::from(is_final);
    aad
}

/// Fill `buf` as far as the reader allows; returns the bytes read
pub(crate) async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
