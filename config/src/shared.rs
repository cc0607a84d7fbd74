//! # Shared Configuration Snapshot
//!
//! Hands every service the same configuration and lets a reload swap it
//! as a whole.

use crate::config::Config;
use parking_lot::RwLock;
use std::sync::Arc;

/// A cloneable handle to the current configuration snapshot.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Readers take an `Arc<Config>` with [`SharedConfig::current`] and keep it
/// for the whole request, so a concurrent [`SharedConfig::replace`] never
/// shows them a half-applied configuration.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, SharedConfig};
///
/// let shared = SharedConfig::new(Config::default());
/// let snapshot = shared.current();
/// let mut next = (*snapshot).clone();
/// next.notify.voice = "Daniel".to_string();
/// shared.replace(next);
/// assert_eq!(snapshot.notify.voice, "Moira");
/// ```
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Returns the current snapshot.
    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&*self.inner.read())
    }

    /// Installs a new snapshot and returns the previous one.
    pub fn replace(&self, config: Config) -> Arc<Config> {
        let next = Arc::new(config);
        std::mem::replace(&mut *self.inner.write(), next)
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}
