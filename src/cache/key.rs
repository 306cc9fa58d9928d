//! Cache Key Module
//!
//! Key validation and the key -> entry file mapping.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::cache::CACHE_FILE_EXTENSION;
use crate::error::{CacheError, Result};

// == Validate Key ==
/// Checks that a key is non-empty and only uses `[A-Za-z0-9_.]`.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');

    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

// == Entry File Name ==
/// Returns the flat file name for a key: hex SHA-256 digest plus the cache extension.
///
/// The digest never contains a path separator, so the result always names a file
/// directly inside the cache directory whatever the key contains.
pub fn entry_file_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}.{}", hasher.finalize(), CACHE_FILE_EXTENSION)
}

// == Entry Path ==
/// Maps a key to its entry file under `dir`.
pub fn entry_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(entry_file_name(key))
}

// == Is Entry File ==
/// Returns true if the path follows the entry file naming convention.
pub fn is_entry_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == CACHE_FILE_EXTENSION)
        .unwrap_or(false)
}
