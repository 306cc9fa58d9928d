//! Configuration Module
//!
//! Holds the cache directory and the optional sweeper interval.

use std::path::PathBuf;

/// Default cache directory when none is given.
pub const DEFAULT_CACHE_DIR: &str = "/tmp/cache";

/// File cache configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one file per entry
    pub cache_dir: PathBuf,
    /// Seconds between background sweeps, None = lazy eviction only
    pub sweep_interval: Option<u64>,
}

impl Config {
    /// Creates a config for the given cache directory with no background sweep.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            sweep_interval: None,
        }
    }

    /// Enables the background sweeper with the given interval in seconds.
    pub fn with_sweep_interval(mut self, secs: u64) -> Self {
        self.sweep_interval = Some(secs);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert!(config.sweep_interval.is_none());
    }

    #[test]
    fn test_config_with_sweep_interval() {
        let config = Config::new("/var/cache/app").with_sweep_interval(30);
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/app"));
        assert_eq!(config.sweep_interval, Some(30));
    }
}
