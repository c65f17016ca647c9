pub mod agenda;
pub mod recurring;
pub mod refresh;
pub mod status;
pub mod tasks;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use homeboard_core::{CacheStore, HomeboardConfig, SystemClock};

/// A cache store backed by the system clock.
pub fn open_cache(config: &HomeboardConfig) -> Result<CacheStore> {
    Ok(CacheStore::from_config(config, Arc::new(SystemClock))?)
}
