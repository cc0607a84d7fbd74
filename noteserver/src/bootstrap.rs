//! Startup: command line, layered configuration, plugin registration.

use adapters::{CommandClipboard, CommandEditor, OsaScriptNotifier, OsaScriptPrompter, SystemClock};
use anyhow::Context;
use clap::Parser;
use clip::ClipPlugin;
use config::{Config, load_from_env, load_from_file, merge_configs, validate};
use notes::NotesPlugin;
use plugin::{PluginRegistry, RegistryError};
use relays::{HmacDeriver, KeyPlugin, NotifyPlugin, UserPlugin};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Command-line flags. Each one overrides the file and environment.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "noteserver", version, about = "Personal automation daemon")]
pub struct Args {
    #[arg(long, help = "Configuration file (YAML or TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Listen address (host:port)")]
    pub address: Option<String>,

    #[arg(long, help = "Editor command line")]
    pub editor: Option<String>,

    #[arg(long, help = "Clip save file")]
    pub clips: Option<String>,

    #[arg(long, help = "Key policy file")]
    pub keyconfig: Option<String>,

    #[arg(long, help = "Notification sound")]
    pub sound: Option<String>,

    #[arg(long, help = "Speech voice")]
    pub voice: Option<String>,

    #[arg(long, help = "Log level (trace, debug, info, warn, error)")]
    pub log: Option<String>,
}

impl Args {
    /// The CLI layer as a config; unset flags stay at their defaults.
    pub fn overrides(&self) -> Config {
        let mut c = Config::default();
        if let Some(v) = &self.address {
            c.address.clone_from(v);
        }
        if let Some(v) = &self.editor {
            c.edit.command = Some(v.clone());
        }
        if let Some(v) = &self.clips {
            c.clip.save_file = Some(v.clone());
        }
        if let Some(v) = &self.keyconfig {
            c.key.config_file = Some(v.clone());
        }
        if let Some(v) = &self.sound {
            c.notify.sound.clone_from(v);
        }
        if let Some(v) = &self.voice {
            c.notify.voice.clone_from(v);
        }
        if let Some(v) = &self.log {
            c.log_level.clone_from(v);
        }
        c
    }

    /// `--config`, or `<config dir>/notifier/config.yaml` when that exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let candidate = dirs::config_dir()?.join("notifier").join("config.yaml");
            candidate.exists().then_some(candidate)
        })
    }
}

/// Builds the effective configuration: defaults < file < env < CLI, then
/// validates it.
pub fn load_config(path: Option<&Path>, cli: &Config) -> anyhow::Result<Config> {
    let file = match path {
        Some(p) => {
            let c = load_from_file(p).with_context(|| format!("loading {}", p.display()))?;
            debug!(path = %p.display(), "Loaded config file");
            c
        }
        None => Config::default(),
    };
    let env = load_from_env().context("reading environment")?;
    let config = merge_configs(
        Config::default(),
        file,
        "file",
        env,
        "env",
        Some(cli.clone()),
        "cli",
    );
    validate(&config).context("invalid configuration")?;
    crate::auth::check_rules(&config.auth).context("invalid auth rule")?;
    Ok(config)
}

/// Registers every built-in plugin with its OS-backed delegates.
pub fn default_registry(config: &Config) -> Result<PluginRegistry, RegistryError> {
    let clipboard = Arc::new(CommandClipboard::from_config(&config.clip).map_err(|e| {
        RegistryError::InitFailed {
            name: "Clip".to_string(),
            source: e.into(),
        }
    })?);
    let prompter = Arc::new(OsaScriptPrompter);
    let editor = Arc::new(CommandEditor);

    let mut registry = PluginRegistry::new();
    registry.register("Clip", ClipPlugin::new(clipboard.clone()))?;
    registry.register("Notes", NotesPlugin::new(editor.clone(), Arc::new(SystemClock)))?;
    registry.register("Notify", NotifyPlugin::new(Arc::new(OsaScriptNotifier)))?;
    registry.register("User", UserPlugin::new(prompter.clone(), editor))?;
    registry.register(
        "Key",
        KeyPlugin::new(prompter, clipboard, Arc::new(HmacDeriver)),
    )?;
    info!(plugins = ?registry.names().collect::<Vec<_>>(), "Plugins registered");
    Ok(registry)
}
