//! Routing of `Service.Method` calls and reload fan-out.

use crate::handler::MethodTable;
use crate::service::Service;
use errors::ServiceError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span};

pub(crate) struct Mounted {
    pub(crate) service: Arc<dyn Service>,
    pub(crate) methods: MethodTable,
}

/// The merged dispatch surface of every active service.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Routes a fully qualified method name to the owning service's handler.
/// Cloning is cheap; clones share the same services.
///
/// ## Usage
/// ```rust,no_run
/// # async fn demo(dispatcher: plugin::Dispatcher) -> Result<(), errors::ServiceError> {
/// let tags = dispatcher.dispatch("Clip.List", serde_json::Value::Null).await?;
/// println!("{tags}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    services: Arc<BTreeMap<String, Mounted>>,
}

impl Dispatcher {
    pub(crate) fn new(services: BTreeMap<String, Mounted>) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    /// Calls `method` (`Service.Method`) with `params`.
    ///
    /// ## Error Handling
    /// Returns `MethodNotFound` for a malformed name, an inactive or unknown
    /// service, or an unknown method. Handler errors pass through unchanged.
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        let handler = self
            .lookup(method)
            .ok_or_else(|| ServiceError::method_not_found(method))?;
        debug!(method, "Dispatching");
        handler.call(params).await
    }

    fn lookup(&self, method: &str) -> Option<Arc<dyn crate::Handler>> {
        let (service, name) = method.split_once('.')?;
        self.services
            .get(service)
            .and_then(|m| m.methods.get(name))
            .cloned()
    }

    /// Names of the active services, sorted.
    pub fn services(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Every routable method name, sorted.
    pub fn methods(&self) -> Vec<String> {
        self.services
            .iter()
            .flat_map(|(service, m)| m.methods.names().map(move |name| format!("{service}.{name}")))
            .collect()
    }

    /// Runs `update` on every active service, each on its own task.
    ///
    /// Dispatch continues while updates run. Failures are logged and never
    /// propagated; [`ReloadHandle::wait`] reports them to callers that care.
    pub fn reload(&self) -> ReloadHandle {
        let tasks = self
            .services
            .iter()
            .map(|(name, mounted)| {
                let service = Arc::clone(&mounted.service);
                let span = info_span!("reload", service = %name);
                let name = name.clone();
                let task = tokio::spawn(
                    async move {
                        match service.update().await {
                            Ok(()) => {
                                debug!("Service updated");
                                true
                            }
                            Err(e) => {
                                error!(error = %format!("{e:#}"), "Service update failed");
                                false
                            }
                        }
                    }
                    .instrument(span),
                );
                (name, task)
            })
            .collect();
        info!(services = self.services.len(), "Reload started");
        ReloadHandle { tasks }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.methods())
            .finish()
    }
}

/// In-flight updates started by [`Dispatcher::reload`]. Dropping the handle
/// detaches them.
#[derive(Debug)]
pub struct ReloadHandle {
    tasks: Vec<(String, JoinHandle<bool>)>,
}

/// Outcome of a completed reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

impl ReloadHandle {
    /// Waits for every update to finish.
    pub async fn wait(self) -> ReloadSummary {
        let mut summary = ReloadSummary::default();
        for (name, task) in self.tasks {
            match task.await {
                Ok(true) => summary.updated.push(name),
                Ok(false) => summary.failed.push(name),
                Err(e) => {
                    error!(service = %name, error = %e, "Service update task aborted");
                    summary.failed.push(name);
                }
            }
        }
        summary
    }
}
