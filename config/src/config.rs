//! # Configuration Structures
//!
//! Settings for the notifier daemon and every service it hosts.
//!
//! All structures deserialize from camelCase keys, carry `validator` rules,
//! and fill absent fields with their documented defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;
use validator::Validate;

/// Top-level configuration for the notifier daemon.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Aggregates the listener settings, the access hook and the per-service
/// sections. A loaded `Config` is treated as an immutable snapshot; reloads
/// replace it as a whole (see [`crate::SharedConfig`]).
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let mut config = Config::default();
/// config.address = "localhost:8765".to_string();
/// assert_eq!(config.notify.voice, "Moira");
/// ```
///
/// ## Fields
/// - `address`: listen address `host:port` (required)
/// - `log_level`: default tracing level, overridden by `RUST_LOG`
/// - `request_timeout_seconds`: per-request deadline, 0 disables it
/// - `auth`: shared token and method rules
/// - `clip`, `edit`, `notes`, `key`, `notify`: per-service settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Listen address, `host:port`
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub address: String,

    /// Default log level
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// Per-request dispatch deadline in seconds (0 = none)
    #[serde(default = "default_request_timeout")]
    #[validate(range(max = 86_400))]
    pub request_timeout_seconds: u64,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub clip: ClipConfig,

    #[serde(default)]
    pub edit: EditConfig,

    #[serde(default)]
    #[validate(nested)]
    pub notes: NotesConfig,

    #[serde(default)]
    pub key: KeyConfig,

    #[serde(default)]
    #[validate(nested)]
    pub notify: NotifyConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    600
}

fn validate_log_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level")),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: String::new(),
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            auth: AuthConfig::default(),
            clip: ClipConfig::default(),
            edit: EditConfig::default(),
            notes: NotesConfig::default(),
            key: KeyConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Access hook settings.
///
/// When `token` is set every non-`rpc.` request must carry it. `rules` are
/// glob patterns over method names; a pattern prefixed with `-` denies, the
/// first matching pattern wins, and a method no pattern matches is denied.
/// An empty list allows every method.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub rules: Vec<String>,
}

/// What `Clip.Set` does with an empty payload under a named tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPolicy {
    /// Remove the tag.
    #[default]
    Delete,
    /// Keep the tag with an empty payload.
    Store,
}

/// Clipboard service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClipConfig {
    /// Backing file for named clips; unset keeps clips in memory only
    #[serde(default)]
    pub save_file: Option<String>,

    #[serde(default)]
    pub empty_policy: EmptyPolicy,

    /// Command line that reads stdin into the system clipboard
    #[serde(default)]
    pub copy_command: Option<String>,

    /// Command line that writes the system clipboard to stdout
    #[serde(default)]
    pub paste_command: Option<String>,
}

impl ClipConfig {
    pub fn save_path(&self) -> Option<PathBuf> {
        self.save_file
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| PathBuf::from(expand_env(s)))
    }
}

/// Editor settings shared by `Notes.Edit` and `User.Edit`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditConfig {
    /// Editor command line; the file path is appended as the last argument
    #[serde(default)]
    pub command: Option<String>,

    /// Create a missing note file before opening it
    #[serde(default)]
    pub touch_new: bool,
}

/// Notes service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_unique_categories"))]
pub struct NotesConfig {
    /// Ordered list of note categories
    #[serde(default)]
    #[validate(nested)]
    pub categories: Vec<NoteCategory>,
}

fn validate_unique_categories(notes: &NotesConfig) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::new();
    for category in &notes.categories {
        if !seen.insert(category.name.as_str()) {
            let mut err = validator::ValidationError::new("duplicate_category");
            err.message = Some(format!("duplicate note category {:?}", category.name).into());
            return Err(err);
        }
    }
    Ok(())
}

impl NotesConfig {
    pub fn category(&self, name: &str) -> Option<&NoteCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// A named directory of date-versioned note files.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Maps a category name onto a directory and a default file suffix. Note
/// files inside the directory are named `<tag>-<YYYYMMDD><suffix>`.
///
/// ## Usage
/// ```rust,no_run
/// use config::NoteCategory;
///
/// let cat = NoteCategory::new("work", "$HOME/notes/work", "md");
/// let path = cat.file_path("standup", "20240102", None);
/// assert!(path.ends_with("standup-20240102.md"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NoteCategory {
    #[validate(length(min = 1, max = 255), custom(function = "validate_category_name"))]
    pub name: String,

    /// Directory holding the notes; `$VAR` and `${VAR}` are expanded at use
    #[validate(length(min = 1))]
    pub dir: String,

    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    ".txt".to_string()
}

fn validate_category_name(value: &str) -> Result<(), validator::ValidationError> {
    if value.contains('/') {
        return Err(validator::ValidationError::new(
            "Category name may not contain '/'",
        ));
    }
    Ok(())
}

impl NoteCategory {
    pub fn new(name: impl Into<String>, dir: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    /// The configured suffix with a leading dot, `.txt` when unset.
    pub fn effective_suffix(&self) -> String {
        match self.suffix.as_str() {
            "" => default_suffix(),
            s if s.starts_with('.') => s.to_string(),
            s => format!(".{s}"),
        }
    }

    /// The category directory with environment references expanded.
    pub fn expanded_dir(&self) -> PathBuf {
        PathBuf::from(expand_env(&self.dir))
    }

    /// Builds `<dir>/<base>-<version><ext>`, falling back to the category
    /// suffix when `ext` is absent or empty.
    pub fn file_path(&self, base: &str, version: &str, ext: Option<&str>) -> PathBuf {
        let ext = match ext {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => self.effective_suffix(),
        };
        self.expanded_dir().join(format!("{base}-{version}{ext}"))
    }
}

/// Key generator settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyConfig {
    /// Site policy file; the `Key` service stays inactive without it
    #[serde(default)]
    pub config_file: Option<String>,
}

impl KeyConfig {
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_file
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| PathBuf::from(expand_env(s)))
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotifyConfig {
    /// Sound played by audible notifications
    #[serde(default = "default_sound")]
    #[validate(length(min = 1))]
    pub sound: String,

    /// Voice used by `Notify.Say` when the request names none
    #[serde(default = "default_voice")]
    #[validate(length(min = 1))]
    pub voice: String,
}

fn default_sound() -> String {
    "Glass".to_string()
}

fn default_voice() -> String {
    "Moira".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sound: default_sound(),
            voice: default_voice(),
        }
    }
}

static ENV_REF: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap_or_else(|e| panic!("invalid env reference pattern: {e}"))
});

/// Replaces `$VAR` and `${VAR}` with the variable's value. Unset variables
/// expand to the empty string.
pub fn expand_env(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}
