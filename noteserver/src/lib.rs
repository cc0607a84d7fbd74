//! # Noteserver
//!
//! The notifier daemon. Composes the built-in services against one shared
//! configuration and serves them as newline-delimited JSON-RPC 2.0 over TCP.
//!
//! - [`bootstrap`]: flags, layered configuration, plugin registration
//! - [`server`]: the connection loop, auth hook and request timeout
//! - [`reload`]: SIGHUP and config-file triggered reconfiguration

pub mod auth;
pub mod bootstrap;
pub mod reload;
pub mod rpc;
pub mod server;
pub mod telemetry;

pub use auth::{Authorizer, TokenAuthorizer};
pub use bootstrap::{Args, default_registry, load_config};
pub use reload::Reloader;
pub use server::Server;
