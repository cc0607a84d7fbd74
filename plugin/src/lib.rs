//! # Plugin Runtime
//!
//! Composition runtime for the notifier daemon.
//!
//! Independent service modules register under a service name, are
//! initialized against one shared configuration, and have their method
//! tables merged into a single [`Dispatcher`] addressed as
//! `Service.Method`.
//!
//! # Lifecycle
//! - Unregistered → Registered via [`PluginRegistry::register`]
//! - Registered → Active when [`Plugin::init`] returns a service
//! - Registered → Inactive when it returns [`InitError::NotApplicable`]
//! - Registered → startup aborted when it returns [`InitError::Failed`]
//!
//! [`Dispatcher::reload`] asks every active service to refresh itself; it
//! never changes which services are active.

pub mod dispatcher;
pub mod handler;
pub mod service;
pub mod registry;
pub mod wire;

pub use dispatcher::{Dispatcher, ReloadHandle, ReloadSummary};
pub use handler::{Handler, MethodTable};
pub use service::{InitError, Plugin, Service};
pub use registry::{PluginRegistry, RegistryError};
pub use wire::Blob;
