//! # CRUSTy - Password-Based Chunked File Encryption
//!
//! CRUSTy encrypts files of any size under a password without loading them
//! into memory. The plaintext is split into fixed-size chunks, each sealed
//! independently with AES-256-GCM under a key derived once per file with
//! Argon2id.
//!
//! ## Features
//!
//! - **Chunked AEAD**: One tag per chunk, one nonce per chunk, never reused
//! - **Streaming API**: Constant memory in the chunk size, any `AsyncRead`/`AsyncWrite`
//! - **Tamper evidence**: Reordering, splicing, truncation and header edits are all rejected
//! - **Secret hygiene**: Keys, passwords and plaintext buffers are zeroized on drop
//! - **Progress and cancellation**: Per-chunk callback and cooperative cancel token
//!
//! ## Quick Start
//!
//! ```no_run
//! use crusty::encryptor::Encryptor;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let enc = Encryptor::new();
//!
//!     enc.encrypt_file(Path::new("photo.jpg"), Path::new("photo.jpg.encrypted"), b"correct horse")
//!         .await?;
//!     enc.decrypt_file(Path::new("photo.jpg.encrypted"), Path::new("photo.jpg"), b"correct horse")
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Container Format
//!
//! A 41-byte header (`CRU1`, version, salt, base nonce, chunk size,
//! plaintext length) followed by one `[len][ciphertext][tag]` record per
//! chunk. See [`container`].

pub mod aead;
pub mod config;
pub mod container;
pub mod encryptor;
pub mod error;
pub mod kdf;
pub mod metadata;
pub mod nonce;
pub mod streaming;

// Re-export common types for convenience
pub use encryptor::Encryptor;
pub use error::{CryptError, ErrorKind, Result};
pub use streaming::{CancelToken, Hooks};
