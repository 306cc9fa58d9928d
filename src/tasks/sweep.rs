//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entry files.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::FileCache;
use crate::config::Config;

/// Spawns a background task that periodically purges expired cache entries.
///
/// Each sweep runs on the blocking thread pool since it performs synchronous
/// file I/O and may wait on entry locks held by other processes.
///
/// # Arguments
/// * `cache` - Cache handle to sweep (clones share the same directory)
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop sweeping.
///
/// # Example
/// ```ignore
/// let cache = FileCache::new("/tmp/cache")?;
/// let sweep_handle = spawn_sweep_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: FileCache, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task for {} with interval of {} seconds",
            cache.dir().display(),
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweeper = cache.clone();
            let removed = match tokio::task::spawn_blocking(move || sweeper.purge_expired()).await
            {
                Ok(removed) => removed,
                Err(e) => {
                    warn!("TTL sweep failed: {}", e);
                    continue;
                }
            };

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}

/// Starts the sweeper if the config asks for one.
pub fn spawn_configured_sweep(cache: &FileCache, config: &Config) -> Option<JoinHandle<()>> {
    config
        .sweep_interval
        .filter(|secs| *secs > 0)
        .map(|secs| spawn_sweep_task(cache.clone(), secs))
}
