//! Save-file format and atomic persistence.
//!
//! The file is a JSON object mapping each tag to its base64 payload. It is
//! rewritten wholesale on every mutation by writing a temporary file in the
//! same directory and renaming it over the original.

use crate::store::ACTIVE;
use plugin::Blob;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) type Clips = BTreeMap<String, Vec<u8>>;

/// Save-file failures.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("reading clips from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding clips in {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("writing clips to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding clips: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Loads the save file. A missing file yields no clips; the reserved
/// `"active"` key is dropped if present.
pub(crate) fn load(path: &Path) -> Result<Clips, ClipError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No clip file yet");
            return Ok(Clips::new());
        }
        Err(source) => {
            return Err(ClipError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let decoded: BTreeMap<String, Blob> =
        serde_json::from_slice(&bytes).map_err(|source| ClipError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let mut clips: Clips = decoded
        .into_iter()
        .map(|(tag, blob)| (tag, blob.into_inner()))
        .collect();
    if clips.remove(ACTIVE).is_some() {
        warn!(path = %path.display(), "Dropped reserved tag {ACTIVE:?} from clip file");
    }
    Ok(clips)
}

pub(crate) fn encode(clips: &Clips) -> Result<Vec<u8>, ClipError> {
    let view: BTreeMap<&str, Blob> = clips
        .iter()
        .map(|(tag, data)| (tag.as_str(), Blob::from(data.as_slice())))
        .collect();
    Ok(serde_json::to_vec(&view)?)
}

/// Replaces the file at `path` with `contents` atomically. The file is
/// readable by its owner only.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ClipError> {
    let wrap = |source| ClipError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".clips")
        .tempfile_in(dir)
        .map_err(wrap)?;
    tmp.write_all(contents).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(wrap)?;
    }
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("clips.json")).unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(ClipError::Decode { .. })));
    }

    #[test]
    fn test_load_drops_active() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.json");
        std::fs::write(&path, r#"{"active":"eA==","x":"aGk="}"#).unwrap();

        let clips = load(&path).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips["x"], b"hi");
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.json");
        let mut clips = Clips::new();
        clips.insert("greeting".to_string(), b"hello".to_vec());
        clips.insert("empty".to_string(), Vec::new());

        write_atomic(&path, &encode(&clips).unwrap()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["greeting"], "aGVsbG8=");
        assert_eq!(load(&path).unwrap(), clips);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.json");
        write_atomic(&path, b"{}").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
