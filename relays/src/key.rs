//! The `Key` service.

use crate::deriver::{PassphraseDeriver, fingerprint};
use crate::policy::{KeyPolicy, SitePolicy};
use adapters::{Clipboard, Prompter, TextPrompt};
use async_trait::async_trait;
use config::SharedConfig;
use errors::ServiceError;
use parking_lot::RwLock;
use plugin::handler::{no_params, typed};
use plugin::{InitError, MethodTable, Plugin, Service};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const MIN_LENGTH: usize = 6;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub host: String,
    pub format: Option<String>,
    pub length: Option<usize>,
    pub punct: Option<bool>,
    pub salt: Option<String>,
    pub copy: bool,
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateReply {
    /// Empty when the key was copied to the clipboard instead.
    pub key: String,
    pub hash: String,
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteRequest {
    pub host: String,
    pub full: bool,
    pub strict: bool,
}

/// Registers passphrase generation as the `Key` service. Active only when
/// `key.configFile` is set.
pub struct KeyPlugin {
    prompter: Arc<dyn Prompter>,
    clipboard: Arc<dyn Clipboard>,
    deriver: Arc<dyn PassphraseDeriver>,
}

impl KeyPlugin {
    pub fn new(
        prompter: Arc<dyn Prompter>,
        clipboard: Arc<dyn Clipboard>,
        deriver: Arc<dyn PassphraseDeriver>,
    ) -> Self {
        Self {
            prompter,
            clipboard,
            deriver,
        }
    }
}

impl Plugin for KeyPlugin {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        let Some(path) = config.current().key.config_path() else {
            return Err(InitError::NotApplicable);
        };
        let policy = load(&path)?;
        Ok(Arc::new(KeyService {
            config: config.clone(),
            policy: RwLock::new(policy),
            prompter: Arc::clone(&self.prompter),
            clipboard: Arc::clone(&self.clipboard),
            deriver: Arc::clone(&self.deriver),
        }))
    }
}

fn load(path: &Path) -> anyhow::Result<KeyPolicy> {
    let policy = KeyPolicy::load(path)?;
    info!(path = %path.display(), sites = policy.sites.len(), "Loaded key policy");
    Ok(policy)
}

struct KeyService {
    config: SharedConfig,
    policy: RwLock<KeyPolicy>,
    prompter: Arc<dyn Prompter>,
    clipboard: Arc<dyn Clipboard>,
    deriver: Arc<dyn PassphraseDeriver>,
}

impl KeyService {
    fn site(&self, host: &str) -> (SitePolicy, bool) {
        self.policy.read().site(host)
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, ServiceError> {
        if req.host.is_empty() {
            return Err(ServiceError::invalid_request("missing host name"));
        }
        let (mut site, known) = self.site(&req.host);
        if !known && req.strict {
            return Err(ServiceError::invalid_request(format!(
                "no match for host: {:?}",
                req.host
            )));
        }
        if let Some(format) = req.format {
            site.format = format;
        }
        if let Some(length) = req.length {
            site.length = length;
        }
        if req.punct.is_some() {
            site.punct = req.punct;
        }
        if let Some(salt) = req.salt {
            site.salt = salt;
        }
        if site.length < MIN_LENGTH {
            return Err(ServiceError::invalid_request(format!(
                "invalid key length {} < {MIN_LENGTH}",
                site.length
            )));
        }
        let format_len = site.format.chars().count();
        if format_len > 0 && format_len < MIN_LENGTH {
            return Err(ServiceError::invalid_request(format!(
                "invalid format length {format_len} < {MIN_LENGTH}"
            )));
        }

        let secret = self
            .prompter
            .prompt_text(&TextPrompt {
                prompt: format!("Secret key for {:?}", site.host),
                default: String::new(),
                hide: true,
            })
            .await?;
        let key = self.deriver.derive(&site, &secret)?;
        let mut reply = GenerateReply {
            hash: fingerprint(&key),
            label: site.host,
            key,
        };
        if req.copy {
            self.clipboard.write(reply.key.as_bytes()).await?;
            reply.key.clear();
        }
        Ok(reply)
    }

    fn list(&self) -> Vec<String> {
        self.policy.read().names()
    }

    fn site_info(&self, req: SiteRequest) -> Result<SitePolicy, ServiceError> {
        if req.host.is_empty() {
            return Err(ServiceError::invalid_request("missing host name"));
        }
        let (mut site, known) = self.site(&req.host);
        if !known && req.strict {
            return Err(ServiceError::not_found(format!(
                "no config for {:?}",
                req.host
            )));
        }
        if !req.full {
            site.hints.clear();
            site.otp = None;
        }
        Ok(site)
    }
}

#[async_trait]
impl Service for KeyService {
    async fn update(&self) -> anyhow::Result<()> {
        let Some(path) = self.config.current().key.config_path() else {
            warn!("key.configFile no longer set; keeping the loaded policy");
            return Ok(());
        };
        let policy = tokio::task::spawn_blocking(move || load(&path)).await??;
        *self.policy.write() = policy;
        Ok(())
    }

    fn methods(self: Arc<Self>) -> MethodTable {
        let generate = Arc::clone(&self);
        let list = Arc::clone(&self);
        let site = self;
        MethodTable::new()
            .with(
                "Generate",
                typed(move |req: GenerateRequest| {
                    let svc = Arc::clone(&generate);
                    async move { svc.generate(req).await }
                }),
            )
            .with(
                "List",
                no_params(move || {
                    let svc = Arc::clone(&list);
                    async move { Ok::<_, ServiceError>(svc.list()) }
                }),
            )
            .with(
                "Site",
                typed(move |req: SiteRequest| {
                    let svc = Arc::clone(&site);
                    async move { svc.site_info(req) }
                }),
            )
    }
}
