//! # Environment Variable Loader
//!
//! Loads configuration overrides from environment variables.
//!
//! # Variables
//! - `NOTIFIER_ADDR`: listen address
//! - `NOTIFIER_LOG_LEVEL`: default log level
//! - `NOTIFIER_TOKEN`: shared access token
//! - `NOTIFIER_CLIPS`: clip save file
//! - `NOTIFIER_KEYCONFIG`: key policy file
//! - `NOTIFIER_TIMEOUT_SECONDS`: per-request deadline
//! - `EDITOR`: editor command line

use crate::config::{AuthConfig, ClipConfig, Config, EditConfig, KeyConfig};
use std::env;

/// Environment variable loading error.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Load configuration from environment variables.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Builds a `Config` whose fields come from the environment. Unset
/// variables leave the defaults in place, so the result can be layered
/// with [`crate::merge_configs`].
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("Address from env: {}", config.address);
///     Ok(())
/// }
/// ```
pub fn load_from_env() -> Result<Config, EnvError> {
    let defaults = Config::default();
    Ok(Config {
        address: env::var("NOTIFIER_ADDR").unwrap_or_default(),
        log_level: env::var("NOTIFIER_LOG_LEVEL").unwrap_or(defaults.log_level),
        request_timeout_seconds: parse_env("NOTIFIER_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.request_timeout_seconds),
        auth: AuthConfig {
            token: non_empty("NOTIFIER_TOKEN"),
            ..defaults.auth
        },
        clip: ClipConfig {
            save_file: non_empty("NOTIFIER_CLIPS"),
            ..defaults.clip
        },
        edit: EditConfig {
            command: non_empty("EDITOR"),
            ..defaults.edit
        },
        key: KeyConfig {
            config_file: non_empty("NOTIFIER_KEYCONFIG"),
        },
        notes: defaults.notes,
        notify: defaults.notify,
    })
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.is_empty() => {
            value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| EnvError::InvalidValue {
                    name: name.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}
