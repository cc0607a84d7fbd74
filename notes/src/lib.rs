//! # Notes
//!
//! Resolves (tag, category, version) queries onto date-stamped note files
//! and exposes them as the `Notes` service.
//!
//! Note files live in per-category directories and are named
//! `<tag>-<YYYYMMDD><suffix>`. Nothing is cached: every query rescans the
//! directories involved.

pub mod note;
pub mod resolver;
pub mod service;

pub use note::{Note, NoteWithText};
pub use resolver::{NoteResolver, VersionSpec};
pub use service::NotesPlugin;
