//! Global configuration management for merkle_stream
//!
//! This module provides the engine settings stored in
//! ~/.merkle-stream/config.toml

pub mod global_config;

// Re-export commonly used items
pub use global_config::{GlobalConfig, HashConfig, StreamingConfig};
