//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)

use crate::config::{AuthConfig, ClipConfig, Config, EditConfig, NotesConfig, NotifyConfig};

/// Merge multiple configuration sources with precedence.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Layers file, environment and CLI configuration over the defaults. A
/// field in a higher layer wins when it differs from the default value;
/// fields left at their defaults do not mask lower layers.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, merge_configs, load_from_file, load_from_env};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let defaults = Config::default();
///     let from_file = load_from_file(Path::new("notifier.yaml"))?;
///     let from_env = load_from_env()?;
///
///     let _config = merge_configs(defaults, from_file, "file", from_env, "env", None, "cli");
///     Ok(())
/// }
/// ```
///
/// ## Lists
/// `notes.categories` and `auth.rules` are replaced as a whole by the
/// highest layer that sets them.
pub fn merge_configs(
    defaults: Config,
    file_config: Config,
    file_source_name: &str,
    env_config: Config,
    env_source_name: &str,
    cli_config: Option<Config>,
    cli_source_name: &str,
) -> Config {
    let mut config = defaults;

    config = merge_with_logging(config, file_config, file_source_name);
    config = merge_with_logging(config, env_config, env_source_name);

    if let Some(cli) = cli_config {
        config = merge_with_logging(config, cli, cli_source_name);
    }

    config
}

fn merge_with_logging(mut base: Config, override_config: Config, source_name: &str) -> Config {
    let defaults = Config::default();
    let mut changes = Vec::new();

    if override_config.address != defaults.address && override_config.address != base.address {
        changes.push(format!("address = {}", override_config.address));
        base.address.clone_from(&override_config.address);
    }
    if override_config.log_level != defaults.log_level
        && override_config.log_level != base.log_level
    {
        changes.push(format!("logLevel = {}", override_config.log_level));
        base.log_level.clone_from(&override_config.log_level);
    }
    if override_config.request_timeout_seconds != defaults.request_timeout_seconds
        && override_config.request_timeout_seconds != base.request_timeout_seconds
    {
        changes.push(format!(
            "requestTimeoutSeconds = {}",
            override_config.request_timeout_seconds
        ));
        base.request_timeout_seconds = override_config.request_timeout_seconds;
    }

    merge_auth(&mut base.auth, &override_config.auth, &mut changes);
    merge_clip(&mut base.clip, &override_config.clip, &mut changes);
    merge_edit(&mut base.edit, &override_config.edit, &mut changes);
    merge_notes(&mut base.notes, &override_config.notes, &mut changes);
    merge_notify(&mut base.notify, &override_config.notify, &mut changes);

    if let Some(path) = &override_config.key.config_file {
        if base.key.config_file.as_ref() != Some(path) {
            changes.push(format!("key.configFile = {path}"));
            base.key.config_file = Some(path.clone());
        }
    }

    if !changes.is_empty() {
        tracing::info!(source = source_name, ?changes, "Configuration overrides applied");
    }

    base
}

fn merge_option(
    base: &mut Option<String>,
    override_value: Option<&String>,
    field: &str,
    redact: bool,
    changes: &mut Vec<String>,
) {
    if let Some(value) = override_value {
        if base.as_ref() != Some(value) {
            if redact {
                changes.push(format!("{field} = ***"));
            } else {
                changes.push(format!("{field} = {value}"));
            }
            *base = Some(value.clone());
        }
    }
}

fn merge_auth(base: &mut AuthConfig, override_config: &AuthConfig, changes: &mut Vec<String>) {
    merge_option(
        &mut base.token,
        override_config.token.as_ref(),
        "auth.token",
        true,
        changes,
    );
    if !override_config.rules.is_empty() && override_config.rules != base.rules {
        changes.push(format!("auth.rules = {:?}", override_config.rules));
        base.rules.clone_from(&override_config.rules);
    }
}

fn merge_clip(base: &mut ClipConfig, override_config: &ClipConfig, changes: &mut Vec<String>) {
    merge_option(
        &mut base.save_file,
        override_config.save_file.as_ref(),
        "clip.saveFile",
        false,
        changes,
    );
    merge_option(
        &mut base.copy_command,
        override_config.copy_command.as_ref(),
        "clip.copyCommand",
        false,
        changes,
    );
    merge_option(
        &mut base.paste_command,
        override_config.paste_command.as_ref(),
        "clip.pasteCommand",
        false,
        changes,
    );
    if override_config.empty_policy != ClipConfig::default().empty_policy
        && override_config.empty_policy != base.empty_policy
    {
        changes.push(format!("clip.emptyPolicy = {:?}", override_config.empty_policy));
        base.empty_policy = override_config.empty_policy;
    }
}

fn merge_edit(base: &mut EditConfig, override_config: &EditConfig, changes: &mut Vec<String>) {
    merge_option(
        &mut base.command,
        override_config.command.as_ref(),
        "edit.command",
        false,
        changes,
    );
    if override_config.touch_new && !base.touch_new {
        changes.push("edit.touchNew = true".to_string());
        base.touch_new = true;
    }
}

fn merge_notes(base: &mut NotesConfig, override_config: &NotesConfig, changes: &mut Vec<String>) {
    if !override_config.categories.is_empty() && override_config.categories != base.categories {
        let names: Vec<&str> = override_config
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        changes.push(format!("notes.categories = {names:?}"));
        base.categories.clone_from(&override_config.categories);
    }
}

fn merge_notify(base: &mut NotifyConfig, override_config: &NotifyConfig, changes: &mut Vec<String>) {
    let defaults = NotifyConfig::default();
    if override_config.sound != defaults.sound && override_config.sound != base.sound {
        changes.push(format!("notify.sound = {}", override_config.sound));
        base.sound.clone_from(&override_config.sound);
    }
    if override_config.voice != defaults.voice && override_config.voice != base.voice {
        changes.push(format!("notify.voice = {}", override_config.voice));
        base.voice.clone_from(&override_config.voice);
    }
}
