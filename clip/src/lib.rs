//! # Clip Store
//!
//! Named clipboard slots with save/restore semantics, backed by an optional
//! save file.
//!
//! The tag `"active"` always denotes the live system clipboard and is never
//! stored.

pub mod persist;
pub mod service;
pub mod store;

pub use persist::ClipError;
pub use service::ClipPlugin;
pub use store::{ACTIVE, ClipStore};
