//! Error types for merkle_stream

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`MerkleError`]
///
/// Callers use this to tell a bad call apart from a corrupt artifact or a
/// leaf source that does not match what it was declared to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The arguments of the call were invalid
    InvalidArgument,
    /// A serialized artifact could not be decoded
    MalformedData,
    /// The observed data contradicts what the caller declared
    InconsistentState,
    /// The operation was cancelled through its token
    Cancelled,
    /// Configuration could not be loaded or is invalid
    Configuration,
    /// Underlying I/O failure
    Io,
}

/// Main error type for merkle tree operations
#[derive(Error, Debug)]
pub enum MerkleError {
    /// Argument validation errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Leaf index {index} out of range for tree with {leaf_count} leaves")]
    IndexOutOfRange { index: u64, leaf_count: u64 },

    #[error("Incompatible level cache: {reason}")]
    IncompatibleCache { reason: String },

    /// Malformed data errors
    #[error("Invalid format for {format}: {reason}")]
    InvalidFormat { format: String, reason: String },

    #[error("Unsupported {format} version {version}, supported: {supported}")]
    UnsupportedVersion {
        format: String,
        version: u32,
        supported: u32,
    },

    /// Inconsistent state errors
    #[error("Leaf source produced no leaves")]
    EmptyLeafSource,

    #[error("Inconsistent state: {reason}")]
    InconsistentState { reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {reason}")]
    ConfigurationError { reason: String },

    #[error("Home directory not found")]
    HomeDirectoryNotFound,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MerkleError {
    /// Create a new invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a new index out of range error
    pub fn index_out_of_range(index: u64, leaf_count: u64) -> Self {
        Self::IndexOutOfRange { index, leaf_count }
    }

    /// Create a new incompatible cache error
    pub fn incompatible_cache(reason: impl Into<String>) -> Self {
        Self::IncompatibleCache {
            reason: reason.into(),
        }
    }

    /// Create a new invalid format error
    pub fn invalid_format(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// Create a new inconsistent state error
    pub fn inconsistent_state(reason: impl Into<String>) -> Self {
        Self::InconsistentState {
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            reason: reason.into(),
        }
    }

    /// Attach a path to an I/O error
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument { .. }
            | Self::IndexOutOfRange { .. }
            | Self::IncompatibleCache { .. } => ErrorCategory::InvalidArgument,
            Self::InvalidFormat { .. } | Self::UnsupportedVersion { .. } => {
                ErrorCategory::MalformedData
            }
            Self::EmptyLeafSource | Self::InconsistentState { .. } => {
                ErrorCategory::InconsistentState
            }
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::ConfigurationError { .. } | Self::HomeDirectoryNotFound => {
                ErrorCategory::Configuration
            }
            Self::Io(_) | Self::FileIo { .. } => ErrorCategory::Io,
        }
    }

    /// Whether this error reports a corrupt serialized artifact
    pub fn is_malformed_data(&self) -> bool {
        self.category() == ErrorCategory::MalformedData
    }

    /// Whether this error reports a bad call
    pub fn is_invalid_argument(&self) -> bool {
        self.category() == ErrorCategory::InvalidArgument
    }
}

/// Result type alias for merkle tree operations
pub type Result<T> = std::result::Result<T, MerkleError>;
