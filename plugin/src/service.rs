//! Contracts between the registry and the service modules.

use crate::handler::MethodTable;
use async_trait::async_trait;
use config::SharedConfig;
use std::sync::Arc;

/// Outcome of a plugin declining or failing initialization.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The plugin has nothing to offer under this configuration and is
    /// left out of the dispatch surface.
    #[error("not applicable")]
    NotApplicable,

    /// The plugin cannot start; the host aborts startup.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// A registrable service module.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// A plugin inspects the shared configuration once, at composition time,
/// and either produces a running [`Service`] or declines. The handle it
/// receives stays valid for the life of the process, so a service that
/// keeps it observes every later reload.
///
/// ## Usage
/// ```rust,no_run
/// use config::SharedConfig;
/// use plugin::{InitError, MethodTable, Plugin, Service};
/// use std::sync::Arc;
///
/// struct Echo;
/// impl Service for Echo {
///     fn methods(self: Arc<Self>) -> MethodTable {
///         MethodTable::new()
///     }
/// }
///
/// struct EchoPlugin;
/// impl Plugin for EchoPlugin {
///     fn init(&self, _config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
///         Ok(Arc::new(Echo))
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError>;
}

/// An initialized service module.
#[async_trait]
pub trait Service: Send + Sync {
    /// Refreshes internal state after a configuration reload. Errors are
    /// logged by the dispatcher and otherwise ignored.
    async fn update(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Builds the method table mounted under the service's name.
    fn methods(self: Arc<Self>) -> MethodTable;
}

impl<F> Plugin for F
where
    F: Fn(&SharedConfig) -> Result<Arc<dyn Service>, InitError> + Send + Sync,
{
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        self(config)
    }
}
