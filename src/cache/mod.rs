//! Cache Module
//!
//! Provides a filesystem-backed cache with TTL expiration and advisory file locking.

mod entry;
mod key;
mod lock;
mod stats;
mod store;


// Re-export public types
pub use entry::{DecodeError, Envelope, RawEnvelope, Ttl};
pub use key::{entry_file_name, entry_path, is_entry_file, validate_key};
pub use lock::{locked_read, locked_write};
pub use stats::CacheStats;
pub use store::FileCache;

// == Public Constants ==
/// Extension of every entry file in the cache directory
pub const CACHE_FILE_EXTENSION: &str = "cache";
