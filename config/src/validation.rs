//! # Configuration Validation
//!
//! Validates a merged configuration using the `validator` crate.

use crate::config::Config;
use validator::Validate;

/// Validate configuration structure.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Checks a merged configuration before it is served or swapped in by a
/// reload.
///
/// ## Validation Rules
/// - `address`: 1-255 characters
/// - `logLevel`: one of "trace", "debug", "info", "warn", "error"
/// - `requestTimeoutSeconds`: at most one day
/// - `notes.categories`: non-empty names without `/`, unique names,
///   non-empty directories
/// - `notify.sound`, `notify.voice`: non-empty
pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}
