//! Cache Store Module
//!
//! Filesystem-backed cache engine: one locked file per key, TTL checked on read.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::key::{entry_path, is_entry_file, validate_key};
use crate::cache::lock::{locked_read, locked_write};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, Envelope, RawEnvelope, Ttl};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Age after which a zero-length entry file is treated as an abandoned write.
const EMPTY_ENTRY_GRACE: Duration = Duration::from_secs(10);

// == Lookup ==
/// Outcome of reading one entry file.
enum Lookup {
    /// Decoded and not expired
    Live(RawEnvelope),
    /// No file or unreadable file
    Absent,
    /// Zero-length file: a write in progress, or one that never finished
    Pending,
    /// Expired or corrupt; the file has been removed
    Evicted,
}

// == File Cache ==
/// Key/value cache storing every entry as its own file in a directory.
///
/// Clones share the directory and the statistics counters. No entry data is
/// held in memory between calls.
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Directory holding the entry files
    dir: PathBuf,
    /// Process-local counters
    stats: Arc<StatsRecorder>,
}

impl FileCache {
    // == Constructor ==
    /// Opens a cache in `dir`, creating the directory recursively if needed.
    ///
    /// Fails with `DirectoryUnavailable` if the directory cannot be created or
    /// is not writable.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let unavailable = |reason: String| CacheError::DirectoryUnavailable {
            path: dir.clone(),
            reason,
        };

        fs::create_dir_all(&dir).map_err(|e| unavailable(format!("cannot create: {}", e)))?;
        if !dir.is_dir() {
            return Err(unavailable("not a directory".to_string()));
        }

        // Probe file is removed when dropped.
        tempfile::Builder::new()
            .prefix(".write_probe")
            .tempfile_in(&dir)
            .map_err(|e| unavailable(format!("not writable: {}", e)))?;

        info!("File cache opened at {}", dir.display());

        Ok(Self {
            dir,
            stats: Arc::new(StatsRecorder::default()),
        })
    }

    /// Opens the cache described by a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.cache_dir.clone())
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // == Get ==
    /// Retrieves a value by key, or `default` if it is absent, expired, corrupt
    /// or unreadable.
    ///
    /// Expired and corrupt entry files are deleted as a side effect. A stored
    /// value that does not deserialize into `T` also yields `default`, but the
    /// file is left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        validate_key(key)?;
        Ok(self.read_value(key).unwrap_or(default))
    }

    // == Set ==
    /// Stores a value with an optional TTL; `None` never expires.
    ///
    /// Returns `Ok(false)` if the entry could not be encoded or written.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Ttl>) -> Result<bool> {
        validate_key(key)?;
        Ok(self.write_value(key, value, ttl))
    }

    // == Has ==
    /// Returns true if `get` would return something other than `null`.
    ///
    /// A stored JSON `null` (for example `Option::None`) reads as absent.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(!self.get(key, Value::Null)?.is_null())
    }

    // == Delete ==
    /// Removes an entry. Returns true if it is gone, including when it never existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(remove_entry_file(&entry_path(&self.dir, key)))
    }

    // == Clear ==
    /// Removes every entry file in the directory, leaving other files alone.
    ///
    /// Keeps going after a failed removal and returns false if any failed.
    pub fn clear(&self) -> bool {
        let listing = match self.entry_files() {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Failed to list cache directory {}: {}", self.dir.display(), e);
                return false;
            }
        };

        let mut removed = 0;
        for path in &listing.files {
            if remove_entry_file(path) {
                removed += 1;
            }
        }

        let failed = listing.files.len() - removed + listing.skipped;
        if failed > 0 {
            warn!("Cleared {} cache entries, {} could not be removed", removed, failed);
        } else {
            info!("Cleared {} cache entries", removed);
        }
        failed == 0
    }

    // == Get Multiple ==
    /// Retrieves several keys at once, using `default` for each miss.
    ///
    /// Every key is validated before any file is read.
    pub fn get_multiple<T, I, K>(&self, keys: I, default: T) -> Result<HashMap<String, T>>
    where
        T: DeserializeOwned + Clone,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = validate_all(keys.into_iter().collect::<Vec<_>>(), |k| k.as_ref())?;

        Ok(keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref();
                let value = self.read_value(key).unwrap_or_else(|| default.clone());
                (key.to_string(), value)
            })
            .collect())
    }

    // == Set Multiple ==
    /// Stores several entries with the same TTL.
    ///
    /// Every key is validated before any file is written. Not atomic: each entry
    /// is attempted and the result is true only if all succeeded.
    pub fn set_multiple<I, K, V>(&self, entries: I, ttl: Option<Ttl>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let entries = validate_all(entries.into_iter().collect::<Vec<_>>(), |(k, _)| k.as_ref())?;

        let mut success = true;
        for (key, value) in &entries {
            if !self.write_value(key.as_ref(), value, ttl) {
                success = false;
            }
        }
        Ok(success)
    }

    // == Delete Multiple ==
    /// Removes several entries. Every key is validated before any file is removed.
    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = validate_all(keys.into_iter().collect::<Vec<_>>(), |k| k.as_ref())?;

        let mut success = true;
        for key in &keys {
            if !remove_entry_file(&entry_path(&self.dir, key.as_ref())) {
                success = false;
            }
        }
        Ok(success)
    }

    // == Purge Expired ==
    /// Removes every expired or corrupt entry file, plus empty entry files left
    /// behind by a write that never finished.
    ///
    /// Returns the number of files removed.
    pub fn purge_expired(&self) -> usize {
        let listing = match self.entry_files() {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Failed to list cache directory {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        listing
            .files
            .iter()
            .filter(|path| match self.lookup(path) {
                Lookup::Evicted => true,
                Lookup::Pending if is_abandoned(path) => {
                    warn!("Removing abandoned empty cache entry {}", path.display());
                    let removed = remove_entry_file(path);
                    if removed {
                        self.stats.record_eviction();
                    }
                    removed
                }
                Lookup::Live(_) | Lookup::Absent | Lookup::Pending => false,
            })
            .count()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total_entries = self
            .entry_files()
            .map(|listing| listing.files.len())
            .unwrap_or(0);
        self.stats.snapshot(total_entries)
    }

    // == Internals ==

    fn read_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = entry_path(&self.dir, key);

        let envelope = match self.lookup(&path) {
            Lookup::Live(envelope) => envelope,
            Lookup::Absent | Lookup::Pending | Lookup::Evicted => {
                debug!("Cache miss: {}", key);
                self.stats.record_miss();
                return None;
            }
        };

        match envelope.into_value() {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                debug!("Cache entry {} has a different value type: {}", key, e);
                self.stats.record_miss();
                None
            }
        }
    }

    fn write_value<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Ttl>) -> bool {
        let bytes = match Envelope::new(value, ttl).encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode cache entry {}: {}", key, e);
                self.stats.record_write(false);
                return false;
            }
        };

        let path = entry_path(&self.dir, key);
        let ok = match locked_write(&path, &bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write cache entry {}: {}", path.display(), e);
                false
            }
        };

        self.stats.record_write(ok);
        ok
    }

    /// Reads and classifies one entry file, deleting it if expired or corrupt.
    fn lookup(&self, path: &Path) -> Lookup {
        let bytes = match locked_read(path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Lookup::Absent,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                return Lookup::Absent;
            }
        };

        if bytes.is_empty() {
            return Lookup::Pending;
        }

        let envelope = match RawEnvelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Removing corrupt cache entry {}: {}", path.display(), e);
                return self.evict(path);
            }
        };

        if envelope.is_expired() {
            debug!("Removing expired cache entry {}", path.display());
            return self.evict(path);
        }

        Lookup::Live(envelope)
    }

    fn evict(&self, path: &Path) -> Lookup {
        if remove_entry_file(path) {
            self.stats.record_eviction();
        }
        Lookup::Evicted
    }

    /// Lists entry files, skipping any directory entry that cannot be inspected.
    fn entry_files(&self) -> io::Result<EntryListing> {
        let mut listing = EntryListing::default();
        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", self.dir.display(), e);
                    listing.skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !is_entry_file(&path) {
                continue;
            }

            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => listing.files.push(path),
                Ok(_) => {}
                // Deleted by another process since the directory was read.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to inspect cache entry {}: {}", path.display(), e);
                    listing.skipped += 1;
                }
            }
        }
        Ok(listing)
    }
}

// == Entry Listing ==
/// Entry files found in the cache directory.
#[derive(Debug, Default)]
struct EntryListing {
    files: Vec<PathBuf>,
    /// Directory entries that could not be read or inspected
    skipped: usize,
}

// == Helpers ==

/// Validates every key of a batch before any of it is processed.
fn validate_all<E>(items: Vec<E>, key_of: impl Fn(&E) -> &str) -> Result<Vec<E>> {
    for item in &items {
        validate_key(key_of(item))?;
    }
    Ok(items)
}

/// Returns true if an empty entry file has not been touched within the grace period.
fn is_abandoned(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age >= EMPTY_ENTRY_GRACE)
        .unwrap_or(false)
}

/// Removes an entry file. A file that is already gone counts as removed.
fn remove_entry_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to remove cache entry {}: {}", path.display(), e);
            false
        }
    }
}
