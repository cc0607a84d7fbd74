//! Live reconfiguration.

use crate::bootstrap::load_config;
use config::{Config, ConfigReloadEvent, SharedConfig, watch_config};
use plugin::{Dispatcher, ReloadSummary};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Editors often emit several events per save; they are coalesced over this
/// window.
const SETTLE: Duration = Duration::from_millis(200);

/// Re-reads the configuration and re-initializes the composed services.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// On a trigger, rebuilds the configuration from the same layers used at
/// startup. A configuration that fails to load or validate is logged and
/// the current snapshot stays in place. Otherwise the snapshot is replaced
/// and every active service's `update` runs.
///
/// ## Triggers
/// - SIGHUP (unix)
/// - changes to the configuration file
pub struct Reloader {
    path: Option<PathBuf>,
    cli: Config,
    config: SharedConfig,
    dispatcher: Dispatcher,
}

impl Reloader {
    pub fn new(path: Option<PathBuf>, cli: Config, config: SharedConfig, dispatcher: Dispatcher) -> Self {
        Self {
            path,
            cli,
            config,
            dispatcher,
        }
    }

    /// Runs one reload. Returns `None` when the new configuration was
    /// rejected.
    pub async fn reload(&self, trigger: &str) -> Option<ReloadSummary> {
        info!(trigger, "Reloading configuration");
        let path = self.path.clone();
        let cli = self.cli.clone();
        let loaded = tokio::task::spawn_blocking(move || load_config(path.as_deref(), &cli)).await;
        let fresh = match loaded {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => {
                error!(error = %format!("{e:#}"), "Configuration rejected, keeping current settings");
                return None;
            }
            Err(e) => {
                error!(error = %e, "Configuration load task failed");
                return None;
            }
        };

        let previous = self.config.replace(fresh);
        if previous.address != self.config.current().address {
            warn!("address changed; the new address takes effect after a restart");
        }
        let summary = self.dispatcher.reload().wait().await;
        info!(
            updated = summary.updated.len(),
            failed = summary.failed.len(),
            "Reload finished"
        );
        Some(summary)
    }

    /// Waits for triggers until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        let mut events = match &self.path {
            Some(p) => match watch_config(p) {
                Ok(rx) => Some(rx),
                Err(e) => {
                    warn!(error = %e, "Config file watch unavailable");
                    None
                }
            },
            None => None,
        };
        let mut hangup = Hangup::install();

        loop {
            tokio::select! {
                () = hangup.recv() => {
                    self.reload("SIGHUP").await;
                }
                event = next_event(&mut events) => match event {
                    Some(ConfigReloadEvent::Changed(_) | ConfigReloadEvent::Created(_)) => {
                        settle(&mut events).await;
                        self.reload("file change").await;
                    }
                    Some(ConfigReloadEvent::Removed(path)) => {
                        warn!(path = %path.display(), "Config file removed; keeping current settings");
                    }
                    Some(ConfigReloadEvent::Error { path, error }) => {
                        warn!(path = %path.display(), error = %error, "Config watch error");
                    }
                    Some(ConfigReloadEvent::Ready) => debug!("Config watch ready"),
                    None => {
                        debug!("Config watch ended");
                        events = None;
                    }
                },
            }
        }
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<ConfigReloadEvent>>) -> Option<ConfigReloadEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Waits out a burst of file events.
async fn settle(events: &mut Option<mpsc::Receiver<ConfigReloadEvent>>) {
    tokio::time::sleep(SETTLE).await;
    if let Some(rx) = events {
        while rx.try_recv().is_ok() {}
    }
}

struct Hangup {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl Hangup {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let signal = match signal(SignalKind::hangup()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, "SIGHUP handler unavailable");
                    None
                }
            };
            Self { signal }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if let Some(signal) = &mut self.signal {
            if signal.recv().await.is_some() {
                return;
            }
            self.signal = None;
        }
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plugin::{InitError, MethodTable, PluginRegistry, Service};
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Service for Counting {
        async fn update(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn methods(self: Arc<Self>) -> MethodTable {
            MethodTable::new()
        }
    }

    fn setup(yaml: &str) -> (tempfile::TempDir, PathBuf, Reloader, SharedConfig, Arc<AtomicUsize>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        let config = SharedConfig::new(load_config(Some(&path), &Config::default()).unwrap());

        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let mut registry = PluginRegistry::new();
        registry
            .register("Count", move |_: &SharedConfig| -> Result<Arc<dyn Service>, InitError> {
                Ok(Arc::new(Counting(Arc::clone(&counter))))
            })
            .unwrap();
        let dispatcher = registry.compose(&config).unwrap();
        let reloader = Reloader::new(Some(path.clone()), Config::default(), config.clone(), dispatcher);
        (dir, path, reloader, config, updates)
    }

    #[tokio::test]
    #[serial]
    async fn test_reload_replaces_snapshot_and_updates() {
        let (_dir, path, reloader, config, updates) = setup("address: a:1\n");
        std::fs::write(&path, "address: a:1\nnotify:\n  voice: Alex\n").unwrap();

        let summary = reloader.reload("test").await.unwrap();
        assert_eq!(summary.updated, vec!["Count"]);
        assert_eq!(config.current().notify.voice, "Alex");
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_config_keeps_snapshot() {
        let (_dir, path, reloader, config, updates) = setup("address: a:1\n");
        std::fs::write(&path, "address: a:1\nlogLevel: loud\n").unwrap();

        assert!(reloader.reload("test").await.is_none());
        assert_eq!(config.current().log_level, "info");
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_file_change_triggers_reload() {
        let (_dir, path, reloader, config, updates) = setup("address: a:1\n");
        let task = tokio::spawn(Arc::new(reloader).run());
        tokio::time::sleep(Duration::from_millis(300)).await;

        std::fs::write(&path, "address: a:1\nnotify:\n  sound: Ping\n").unwrap();
        let mut waited = Duration::ZERO;
        while updates.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waited += Duration::from_millis(50);
        }
        task.abort();
        assert!(updates.load(Ordering::SeqCst) >= 1);
        assert_eq!(config.current().notify.sound, "Ping");
    }
}
