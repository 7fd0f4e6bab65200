//! Global configuration management
//!
//! Engine settings stored in ~/.merkle-stream/config.toml

use crate::core::error::{MerkleError, Result};
use crate::core::hash::{hash_function_by_name, HashFunction, SHA256_NAME};
use crate::tree::source::DEFAULT_BUFFER_SIZE;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Upper bound for `streaming.cache_top_levels`; no tree over `u64` leaves
/// is taller than this
pub const MAX_CACHE_TOP_LEVELS: u32 = 64;

/// Global configuration for merkle_stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Hash configuration
    pub hash: HashConfig,
    /// Streaming engine configuration
    pub streaming: StreamingConfig,
}

/// Hash function selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Algorithm identifier, e.g. "SHA-256"
    pub algorithm: String,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithm: SHA256_NAME.to_string(),
        }
    }
}

/// Settings for the disk-backed streaming engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Parent directory for per-build scratch directories
    /// (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    /// Number of top non-root levels to keep in a level cache (0 disables)
    pub cache_top_levels: u32,
    /// Buffer size for scratch level files and file-backed leaf sources
    pub io_buffer_size: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            cache_top_levels: 0,
            io_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.io_buffer_size == 0 {
            return Err(MerkleError::configuration(
                "streaming.io_buffer_size must be positive",
            ));
        }
        if self.cache_top_levels > MAX_CACHE_TOP_LEVELS {
            return Err(MerkleError::configuration(format!(
                "streaming.cache_top_levels must be at most {}",
                MAX_CACHE_TOP_LEVELS
            )));
        }
        Ok(())
    }
}

impl GlobalConfig {
    /// Load global configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| MerkleError::file_io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GlobalConfig =
            toml::from_str(content).map_err(|e| MerkleError::ConfigurationError {
                reason: format!("Failed to parse config: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| MerkleError::ConfigurationError {
                reason: format!("Failed to serialize config: {}", e),
            })?;

        std::fs::write(path, content).map_err(|e| MerkleError::file_io(path, e))?;
        Ok(())
    }

    /// Get the path to the global configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let user_dirs = UserDirs::new().ok_or(MerkleError::HomeDirectoryNotFound)?;
        Ok(user_dirs
            .home_dir()
            .join(".merkle-stream")
            .join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.hash_function()?;
        self.streaming.validate()
    }

    /// Resolve the configured hash function
    pub fn hash_function(&self) -> Result<Arc<dyn HashFunction>> {
        hash_function_by_name(&self.hash.algorithm)
            .map_err(|e| MerkleError::configuration(format!("hash.algorithm: {}", e)))
    }
}
