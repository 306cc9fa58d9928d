//! Error types for the file cache
//!
//! Only argument and construction problems are surfaced as errors. Runtime I/O
//! trouble is absorbed by the store and reported through `false`/default returns.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or contains characters outside `[A-Za-z0-9_.]`
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Cache directory cannot be created or written to
    #[error("Cache directory unavailable: {path}: {reason}")]
    DirectoryUnavailable { path: PathBuf, reason: String },
}

impl CacheError {
    /// Returns true if this is a key validation failure.
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, CacheError::InvalidKey(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
