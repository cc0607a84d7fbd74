//! The `Clip` service.

use crate::store::ClipStore;
use adapters::Clipboard;
use async_trait::async_trait;
use config::SharedConfig;
use errors::ServiceError;
use plugin::handler::{no_params, typed};
use plugin::{Blob, InitError, MethodTable, Plugin, Service};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetRequest {
    pub tag: String,
    pub save: String,
    pub data: Blob,
    pub allow_empty: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetRequest {
    pub tag: String,
    pub save: String,
    pub activate: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClearRequest {
    pub tag: String,
}

/// Registers the clip store as the `Clip` service. Always active.
pub struct ClipPlugin {
    clipboard: Arc<dyn Clipboard>,
}

impl ClipPlugin {
    pub fn new(clipboard: Arc<dyn Clipboard>) -> Self {
        Self { clipboard }
    }
}

impl Plugin for ClipPlugin {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        let snapshot = config.current();
        let store = ClipStore::open(
            Arc::clone(&self.clipboard),
            snapshot.clip.save_path(),
            snapshot.clip.empty_policy,
        )
        .map_err(anyhow::Error::from)?;
        Ok(Arc::new(ClipService {
            store,
            config: config.clone(),
        }))
    }
}

struct ClipService {
    store: ClipStore,
    config: SharedConfig,
}

#[async_trait]
impl Service for ClipService {
    async fn update(&self) -> anyhow::Result<()> {
        let snapshot = self.config.current();
        self.store.set_empty_policy(snapshot.clip.empty_policy);
        if snapshot.clip.save_path().as_ref() != self.store.path() {
            warn!("clip.saveFile changed; the new location takes effect after a restart");
        }
        Ok(())
    }

    fn methods(self: Arc<Self>) -> MethodTable {
        let set = Arc::clone(&self);
        let get = Arc::clone(&self);
        let list = Arc::clone(&self);
        let clear = self;
        MethodTable::new()
            .with(
                "Set",
                typed(move |req: SetRequest| {
                    let svc = Arc::clone(&set);
                    async move {
                        svc.store
                            .set(&req.tag, &req.save, req.data.as_bytes(), req.allow_empty)
                            .await
                    }
                }),
            )
            .with(
                "Get",
                typed(move |req: GetRequest| {
                    let svc = Arc::clone(&get);
                    async move {
                        let data = svc.store.get(&req.tag, &req.save, req.activate).await?;
                        Ok::<_, ServiceError>(Blob(data))
                    }
                }),
            )
            .with(
                "List",
                no_params(move || {
                    let svc = Arc::clone(&list);
                    async move { Ok::<_, ServiceError>(svc.store.list().await) }
                }),
            )
            .with(
                "Clear",
                typed(move |req: ClearRequest| {
                    let svc = Arc::clone(&clear);
                    async move { svc.store.clear(&req.tag).await }
                }),
            )
    }
}
