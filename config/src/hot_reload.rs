//! # Configuration Hot Reload
//!
//! Watches the configuration file for changes and emits reload events.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration reload event.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigReloadEvent {
    Ready,

    /// Configuration file changed
    Changed(PathBuf),

    /// Configuration file was removed
    Removed(PathBuf),

    /// Configuration file was created
    Created(PathBuf),

    /// Watcher failure
    Error { path: PathBuf, error: String },
}

/// Errors raised while setting up a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to watch {path}: {source}")]
    Watcher {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watch a configuration file for changes and emit reload events.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Monitors the directory holding the configuration file and reports events
/// that touch the file itself. Watching the directory keeps the watch alive
/// across editors that save by renaming a temporary file over the original.
///
/// ## Usage
/// ```rust,no_run
/// use config::{hot_reload::ConfigReloadEvent, watch_config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut rx = watch_config(std::path::Path::new("notifier.yaml"))?;
///     while let Some(event) = rx.recv().await {
///         if let ConfigReloadEvent::Changed(path) = event {
///             println!("Config changed: {:?}", path);
///         }
///     }
///     Ok(())
/// }
/// ```
///
/// ## Event Types
/// - `Ready`: the watch is established
/// - `Changed`: file content modified
/// - `Created`: file created (or renamed into place)
/// - `Removed`: file deleted
/// - `Error`: the underlying watcher reported a failure
///
/// The watch stops when the receiver is dropped.
pub fn watch_config(config_path: &Path) -> Result<mpsc::Receiver<ConfigReloadEvent>, WatchError> {
    spawn_watch(config_path).map(|(rx, _task)| rx)
}

/// Starts the watch task and returns its handle alongside the receiver.
fn spawn_watch(
    config_path: &Path,
) -> Result<(mpsc::Receiver<ConfigReloadEvent>, JoinHandle<()>), WatchError> {
    if !config_path.exists() {
        return Err(WatchError::NotFound(config_path.to_path_buf()));
    }
    let config_path = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());
    let watch_dir = config_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let (event_tx, mut event_rx) = mpsc::channel(100);
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = event_tx.blocking_send(res);
        },
        notify::Config::default(),
    )
    .map_err(|source| WatchError::Watcher {
        path: config_path.clone(),
        source,
    })?;
    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Watcher {
            path: config_path.clone(),
            source,
        })?;

    let (tx, rx) = mpsc::channel(100);
    let task = tokio::spawn(async move {
        // Moved in so the watch lives as long as the task.
        let _watcher = watcher;
        info!(path = ?config_path, "Watching config file");

        if tx.send(ConfigReloadEvent::Ready).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                () = tx.closed() => {
                    debug!(path = ?config_path, "Receiver dropped, stopping watcher");
                    break;
                }
                event_result = event_rx.recv() => {
                    let Some(event_result) = event_result else {
                        break;
                    };

                    let reload_event = match event_result {
                        Ok(event) => {
                            if !event.paths.iter().any(|p| same_file(p, &config_path)) {
                                continue;
                            }
                            match event.kind {
                                EventKind::Create(_) => {
                                    info!(path = ?config_path, "Config file created");
                                    ConfigReloadEvent::Created(config_path.clone())
                                }
                                EventKind::Modify(_) => {
                                    info!(path = ?config_path, "Config file updated");
                                    ConfigReloadEvent::Changed(config_path.clone())
                                }
                                EventKind::Remove(_) => {
                                    warn!(path = ?config_path, "Config file removed");
                                    ConfigReloadEvent::Removed(config_path.clone())
                                }
                                _ => {
                                    debug!(kind = ?event.kind, "Ignoring event");
                                    continue;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Watch error");
                            ConfigReloadEvent::Error {
                                path: config_path.clone(),
                                error: e.to_string(),
                            }
                        }
                    };

                    if let Err(e) = tx.send(reload_event).await {
                        error!(error = %e, "Failed to send config reload event");
                        break;
                    }
                }
            }
        }
    });

    Ok((rx, task))
}

fn same_file(candidate: &Path, config_path: &Path) -> bool {
    if candidate == config_path {
        return true;
    }
    match (candidate.parent(), candidate.file_name()) {
        (Some(dir), Some(name)) => {
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
            dir.join(name) == config_path
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::time::Duration;

    async fn next_event(rx: &mut mpsc::Receiver<ConfigReloadEvent>) -> ConfigReloadEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("No event received")
    }

    #[test]
    fn test_config_reload_event_partial_eq() {
        let path1 = PathBuf::from("/test/config.yaml");
        let path2 = PathBuf::from("/other/config.yaml");

        assert_eq!(
            ConfigReloadEvent::Changed(path1.clone()),
            ConfigReloadEvent::Changed(path1.clone())
        );
        assert_ne!(
            ConfigReloadEvent::Changed(path1.clone()),
            ConfigReloadEvent::Changed(path2)
        );
        assert_ne!(
            ConfigReloadEvent::Changed(path1.clone()),
            ConfigReloadEvent::Created(path1)
        );
    }

    #[tokio::test]
    async fn test_watch_config_emits_changed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("notifier.yaml");
        fs::write(&config_path, "address: a\n").unwrap();

        let mut rx = watch_config(&config_path).unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);

        fs::write(&config_path, "address: b\n").unwrap();

        match next_event(&mut rx).await {
            ConfigReloadEvent::Changed(path) | ConfigReloadEvent::Created(path) => {
                assert_eq!(path, config_path.canonicalize().unwrap());
            }
            other => panic!("Expected Changed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_watch_config_ignores_sibling_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("notifier.yaml");
        fs::write(&config_path, "address: a\n").unwrap();

        let mut rx = watch_config(&config_path).unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);

        fs::write(temp_dir.path().join("other.txt"), "noise").unwrap();
        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(event.is_err(), "unexpected event: {:?}", event);
    }

    #[tokio::test]
    async fn test_watch_config_nonexistent_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let err = watch_config(&config_path).unwrap_err();
        assert!(matches!(err, WatchError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_watch_config_stops_when_receiver_dropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("notifier.yaml");
        fs::write(&config_path, "address: a\n").unwrap();

        let (mut rx, task) = spawn_watch(&config_path).unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);
        drop(rx);

        fs::write(&config_path, "address: b\n").unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("watch task still running after receiver dropped")
            .unwrap();
    }
}
