use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptError>;

/// Error type for every encrypt/decrypt operation.
///
/// Any variant aborts the whole operation; there is no partial acceptance
/// of a container.
#[derive(Debug, Error)]
pub enum CryptError {
    /// Malformed header, bad magic/version, empty password or salt, bad chunk size
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The password-hashing primitive failed or was misconfigured
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// A chunk's tag did not verify (wrong password, tampering or corruption)
    #[error("Authentication failed: wrong password or tampered data")]
    AuthenticationFailed,

    /// Reconstructed length or record framing disagrees with the header
    #[error("Data corrupted: {0}")]
    DataCorrupted(String),

    /// Underlying read/write/create failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation, e.g. chunk index overflow
    #[error("Internal error: {0}")]
    Internal(String),

    /// Source missing, not a regular file, or same as the destination
    #[error("File operation error: {0}")]
    FileOperation(String),

    /// The cancel token was triggered between chunks
    #[error("Operation cancelled")]
    Cancelled,
}

/// Plain error code, for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParams,
    KeyDerivation,
    AuthenticationFailed,
    DataCorrupted,
    Io,
    Internal,
    FileOperation,
    Cancelled,
}

impl CryptError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn key_derivation(msg: impl Into<String>) -> Self {
        Self::KeyDerivation(msg.into())
    }

    pub fn data_corrupted(msg: impl Into<String>) -> Self {
        Self::DataCorrupted(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn file_operation(msg: impl Into<String>) -> Self {
        Self::FileOperation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParams(_) => ErrorKind::InvalidParams,
            Self::KeyDerivation(_) => ErrorKind::KeyDerivation,
            Self::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Self::DataCorrupted(_) => ErrorKind::DataCorrupted,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
            Self::FileOperation(_) => ErrorKind::FileOperation,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
