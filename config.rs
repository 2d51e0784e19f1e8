//! Configuration management with environment variable support.
//!
//! This module provides [`Config`] for loading and validating CRUSTy settings
//! from JSON files and environment variables.
//!
//! ## Environment Variables
//!
//! - `CRUSTY_CONFIG`: Override config file path
//! - `CRUSTY_CHUNK_SIZE`: Chunk size in bytes
//! - `CRUSTY_KDF_MEMORY_KIB`: Argon2id memory cost
//! - `CRUSTY_KDF_ITERATIONS`: Argon2id passes
//! - `CRUSTY_KDF_PARALLELISM`: Argon2id lanes
//!
//! The KDF parameters are not stored in containers; decrypting with
//! different parameters than were used to encrypt fails authentication.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::container::DEFAULT_CHUNK_SIZE;
use crate::kdf::KdfParams;

/// Environment variable names for configuration overrides
pub const ENV_CONFIG_PATH: &str = "CRUSTY_CONFIG";
pub const ENV_CHUNK_SIZE: &str = "CRUSTY_CHUNK_SIZE";
pub const ENV_KDF_MEMORY_KIB: &str = "CRUSTY_KDF_MEMORY_KIB";
pub const ENV_KDF_ITERATIONS: &str = "CRUSTY_KDF_ITERATIONS";
pub const ENV_KDF_PARALLELISM: &str = "CRUSTY_KDF_PARALLELISM";

/// Chunk sizes above this only cost memory
const LARGE_CHUNK_WARNING: u32 = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunk_size: u32,
    pub kdf: KdfParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            kdf: KdfParams::default(),
        }
    }
}

impl Config {
    /// Load config from file path
    pub fn load(path: &str) -> Result<Self> {
        let s =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let mut config: Config =
            serde_json::from_str(&s).with_context(|| format!("parsing config file {}", path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with environment variable overrides
    /// Priority: ENV vars > config file > defaults
    pub fn load_with_env(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(String::from)
            .or_else(|| env::var(ENV_CONFIG_PATH).ok());

        let mut config = match config_path {
            Some(ref p) if Path::new(p).exists() => {
                info!(path = p, "loading config from file");
                let s = fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p))?;
                serde_json::from_str(&s).with_context(|| format!("parsing config file {}", p))?
            }
            Some(ref p) => {
                warn!(path = p, "config file not found, using defaults");
                Config::default()
            }
            None => {
                debug!("using default configuration");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(chunk_size) = env_number(ENV_CHUNK_SIZE)? {
            debug!(chunk_size, "overriding chunk_size from environment");
            self.chunk_size = chunk_size;
        }
        if let Some(memory_kib) = env_number(ENV_KDF_MEMORY_KIB)? {
            debug!(memory_kib, "overriding kdf.memory_kib from environment");
            self.kdf.memory_kib = memory_kib;
        }
        if let Some(iterations) = env_number(ENV_KDF_ITERATIONS)? {
            debug!(iterations, "overriding kdf.iterations from environment");
            self.kdf.iterations = iterations;
        }
        if let Some(parallelism) = env_number(ENV_KDF_PARALLELISM)? {
            debug!(parallelism, "overriding kdf.parallelism from environment");
            self.kdf.parallelism = parallelism;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if self.chunk_size > LARGE_CHUNK_WARNING {
            warn!(
                chunk_size = self.chunk_size,
                "very large chunk size - peak memory is about one chunk per operation"
            );
        }

        self.kdf.validate().context("invalid kdf settings")?;

        if self.kdf != KdfParams::default() {
            warn!(
                memory_kib = self.kdf.memory_kib,
                iterations = self.kdf.iterations,
                parallelism = self.kdf.parallelism,
                "non-default KDF parameters - the same values are required to decrypt"
            );
        }

        Ok(())
    }

    /// Create a new config with explicit values
    pub fn new(chunk_size: u32, kdf: KdfParams) -> Self {
        Self { chunk_size, kdf }
    }
}

fn env_number<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("parsing {}={:?}", name, value)),
        Err(_) => Ok(None),
    }
}
