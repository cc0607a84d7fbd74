//! # Configuration System
//!
//! Configuration management for the notifier daemon.
//!
//! This crate provides:
//! - Configuration structures for the daemon and its services
//! - Environment variable loading
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (CLI > env > file > defaults)
//! - Configuration validation
//! - Hot reload of the configuration file
//! - A shared snapshot handle that reloads swap atomically

pub mod config;
pub mod file_loader;
pub mod hot_reload;
pub mod loader;
pub mod precedence;
pub mod shared;
pub mod validation;

pub use config::{
    AuthConfig, ClipConfig, Config, EditConfig, EmptyPolicy, KeyConfig, NoteCategory,
    NotesConfig, NotifyConfig, expand_env,
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use hot_reload::{ConfigReloadEvent, WatchError, watch_config};
pub use loader::{EnvError, load_from_env};
pub use precedence::merge_configs;
pub use shared::SharedConfig;
pub use validation::validate;
pub use validator::Validate;
