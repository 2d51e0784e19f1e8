use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::container::Header;
use crate::error::{CryptError, Result};

/// Header summary of a container, readable without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub filename: String,
    pub version: u8,
    pub chunk_size: u32,
    pub plaintext_len: u64,
    pub chunk_count: u64,
    pub container_len: u64,
    pub expected_container_len: u64,
    /// Whether the on-disk length matches what the header declares
    pub consistent: bool,
}

impl ContainerInfo {
    pub async fn read(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .ok_or_else(|| {
                CryptError::file_operation(format!("path has no filename: {}", path.display()))
            })?
            .to_string_lossy()
            .into_owned();

        let container_len = fs::metadata(path).await?.len();
        let mut file = fs::File::open(path).await?;
        let header = Header::read_from(&mut file).await?;
        let expected_container_len = header.expected_container_len()?;

        Ok(Self {
            filename,
            version: header.version,
            chunk_size: header.chunk_size,
            plaintext_len: header.plaintext_len,
            chunk_count: header.chunk_count()?,
            container_len,
            expected_container_len,
            consistent: container_len == expected_container_len,
        })
    }
}
