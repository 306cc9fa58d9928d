//! Background Tasks Module
//!
//! Optional background work. The cache never requires it: expired entries are
//! also removed lazily when read.
//!
//! # Tasks
//! - TTL Sweep: Removes expired and corrupt entry files at a fixed interval

mod sweep;

pub use sweep::{spawn_configured_sweep, spawn_sweep_task};
