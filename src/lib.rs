//! File Cache - A filesystem-backed key/value cache
//!
//! Stores each entry as its own file with a per-entry TTL, using advisory file
//! locks so several processes can share one cache directory.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, FileCache, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_configured_sweep, spawn_sweep_task};
