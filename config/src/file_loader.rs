//! # Configuration File Loading
//!
//! Loads configuration from TOML or YAML files.
//!
//! The format is detected from the file extension.

use crate::config::Config;
use std::path::Path;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML in {path}: {reason}")]
    TomlParse { path: String, reason: String },

    #[error("Failed to parse YAML in {path}: {reason}")]
    YamlParse { path: String, reason: String },

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

fn read(path: &Path) -> Result<String, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigFileError::FileNotFound(path.display().to_string()))
        }
        Err(e) => Err(ConfigFileError::Io(e)),
    }
}

/// Load configuration from a TOML file.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Loads a complete configuration from a TOML file. Unknown keys are
/// rejected.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_toml(Path::new("notifier.toml"))?;
///     println!("Listening on {}", config.address);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = read(path)?;
    toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load configuration from a YAML file.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Loads a complete configuration from a YAML file. Unknown keys are
/// rejected. An empty file yields the defaults.
pub fn load_from_yaml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = read(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load configuration from file with auto-detection.
///
/// # M-CANONICAL-DOCS
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`, `.yml`: YAML format
///
/// ## Error Handling
/// Returns `ConfigFileError` for a missing file, a missing or unsupported
/// extension, or a parse failure in the detected format.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyPolicy;
    use std::fs;

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");

        let toml_content = r#"
address = "localhost:8765"
logLevel = "debug"

[clip]
saveFile = "/tmp/clips.json"
emptyPolicy = "store"

[[notes.categories]]
name = "work"
dir = "/tmp/work"
suffix = ".md"

[[notes.categories]]
name = "home"
dir = "/tmp/home"
"#;
        fs::write(&path, toml_content).unwrap();

        let config = load_from_toml(&path).unwrap();
        assert_eq!(config.address, "localhost:8765");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.clip.empty_policy, EmptyPolicy::Store);
        assert_eq!(config.notes.categories.len(), 2);
        assert_eq!(config.notes.categories[0].name, "work");
        assert_eq!(config.notes.categories[1].suffix, ".txt");
        assert_eq!(config.notify.voice, "Moira");
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.yaml");

        let yaml_content = r#"
address: "localhost:8765"
edit:
  command: vi
notify:
  voice: Daniel
"#;
        fs::write(&path, yaml_content).unwrap();

        let config = load_from_yaml(&path).unwrap();
        assert_eq!(config.edit.command.as_deref(), Some("vi"));
        assert_eq!(config.notify.voice, "Daniel");
        assert_eq!(config.notify.sound, "Glass");
    }

    #[test]
    fn test_load_from_empty_yaml_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(load_from_yaml(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let yml = dir.path().join("a.yml");
        let toml = dir.path().join("a.toml");
        fs::write(&yml, "address: one\n").unwrap();
        fs::write(&toml, "address = \"two\"\n").unwrap();

        assert_eq!(load_from_file(&yml).unwrap().address, "one");
        assert_eq!(load_from_file(&toml).unwrap().address, "two");
    }

    #[test]
    fn test_load_from_file_no_extension() {
        let result = load_from_file(Path::new("/tmp/notifier"));
        assert!(matches!(result, Err(ConfigFileError::NoExtension)));
    }

    #[test]
    fn test_load_from_file_unsupported_format() {
        let result = load_from_file(Path::new("/tmp/notifier.json"));
        assert!(matches!(result, Err(ConfigFileError::UnsupportedFormat(ext)) if ext == "json"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_file(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigFileError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "address: [unterminated\n").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::YamlParse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }
}
