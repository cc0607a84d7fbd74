//! Plugin registration and composition.

use crate::dispatcher::{Dispatcher, Mounted};
use crate::service::{InitError, Plugin};
use config::SharedConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Errors raised while registering or composing plugins. All of them are
/// fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate registration for plugin {name:?}")]
    DuplicateRegistration { name: String },

    #[error("invalid plugin name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("initializing plugin {name:?}: {source}")]
    InitFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Write-once mapping from service name to plugin.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Collects the service modules available to the daemon. Built once in the
/// host before serving; [`PluginRegistry::compose`] turns it into the
/// dispatch surface.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, SharedConfig};
/// use plugin::{InitError, PluginRegistry, Service};
/// use std::sync::Arc;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut registry = PluginRegistry::new();
///     registry.register("Nothing", |_: &SharedConfig| -> Result<Arc<dyn Service>, InitError> {
///         Err(InitError::NotApplicable)
///     })?;
///     let dispatcher = registry.compose(&SharedConfig::new(Config::default()))?;
///     assert!(dispatcher.services().is_empty());
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under `name`.
    ///
    /// ## Error Handling
    /// - `DuplicateRegistration` when `name` is already taken
    /// - `InvalidName` when `name` is empty or contains `.`
    pub fn register<P>(&mut self, name: impl Into<String>, plugin: P) -> Result<(), RegistryError>
    where
        P: Plugin + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::InvalidName {
                name,
                reason: "name is empty".to_string(),
            });
        }
        if name.contains('.') || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName {
                name,
                reason: "name may not contain '.' or whitespace".to_string(),
            });
        }
        if self.plugins.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration { name });
        }
        self.plugins.insert(name, Arc::new(plugin));
        Ok(())
    }

    /// Names of all registered plugins, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Initializes every plugin against `config` and mounts the active ones.
    ///
    /// Plugins are initialized in name order. A plugin that declines is left
    /// out; a plugin that fails aborts composition.
    pub fn compose(&self, config: &SharedConfig) -> Result<Dispatcher, RegistryError> {
        let mut services = BTreeMap::new();
        for (name, plugin) in &self.plugins {
            match plugin.init(config) {
                Ok(service) => {
                    let methods = Arc::clone(&service).methods();
                    if methods.is_empty() {
                        warn!(plugin = %name, "Plugin exposes no methods");
                    }
                    info!(
                        plugin = %name,
                        methods = ?methods.names().collect::<Vec<_>>(),
                        "Plugin activated"
                    );
                    services.insert(name.clone(), Mounted { service, methods });
                }
                Err(InitError::NotApplicable) => {
                    info!(plugin = %name, "Plugin not applicable, skipping");
                }
                Err(InitError::Failed(source)) => {
                    return Err(RegistryError::InitFailed {
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(Dispatcher::new(services))
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}
