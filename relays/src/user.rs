//! The `User` service.

use adapters::{Editor, Prompter, TextPrompt};
use async_trait::async_trait;
use config::SharedConfig;
use errors::{ResultExt, ServiceError};
use plugin::handler::typed;
use plugin::{Blob, InitError, MethodTable, Plugin, Service};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextRequest {
    pub prompt: String,
    pub default: String,
    pub hide: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditRequest {
    /// File name shown in the editor; no directory parts.
    pub name: String,
    pub content: Blob,
}

/// Registers interactive input as the `User` service. Always active.
pub struct UserPlugin {
    prompter: Arc<dyn Prompter>,
    editor: Arc<dyn Editor>,
}

impl UserPlugin {
    pub fn new(prompter: Arc<dyn Prompter>, editor: Arc<dyn Editor>) -> Self {
        Self { prompter, editor }
    }
}

impl Plugin for UserPlugin {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        Ok(Arc::new(UserService {
            config: config.clone(),
            prompter: Arc::clone(&self.prompter),
            editor: Arc::clone(&self.editor),
        }))
    }
}

struct UserService {
    config: SharedConfig,
    prompter: Arc<dyn Prompter>,
    editor: Arc<dyn Editor>,
}

impl UserService {
    async fn text(&self, req: TextRequest) -> Result<String, ServiceError> {
        if req.prompt.is_empty() {
            return Err(ServiceError::invalid_request("missing prompt string"));
        }
        let answer = self
            .prompter
            .prompt_text(&TextPrompt {
                prompt: req.prompt,
                default: req.default,
                hide: req.hide,
            })
            .await?;
        Ok(answer)
    }

    /// Edits `content` in a scratch file named `name` and returns the result.
    async fn edit(&self, req: EditRequest) -> Result<Blob, ServiceError> {
        let Some(command) = self
            .config
            .current()
            .edit
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
        else {
            return Err(ServiceError::internal("User.Edit", "no editor is configured"));
        };
        if req.name.is_empty() {
            return Err(ServiceError::invalid_request("missing file name"));
        }
        if req.name.contains('/') || req.name == "." || req.name == ".." {
            return Err(ServiceError::invalid_request(format!(
                "invalid file name {:?}",
                req.name
            )));
        }

        // Removed on drop, including when the request is cancelled.
        let scratch = tempfile::Builder::new()
            .prefix("User.Edit.")
            .tempdir()
            .internal("creating scratch directory")?;
        let path = scratch.path().join(&req.name);
        tokio::fs::write(&path, req.content.as_bytes())
            .await
            .internal(format!("writing {}", path.display()))?;

        debug!(path = %path.display(), "Editing scratch file");
        self.editor.edit(&command, &path).await?;

        let edited = tokio::fs::read(&path)
            .await
            .internal(format!("reading {}", path.display()))?;
        Ok(Blob(edited))
    }
}

#[async_trait]
impl Service for UserService {
    fn methods(self: Arc<Self>) -> MethodTable {
        let text = Arc::clone(&self);
        let edit = self;
        MethodTable::new()
            .with(
                "Text",
                typed(move |req: TextRequest| {
                    let svc = Arc::clone(&text);
                    async move { svc.text(req).await }
                }),
            )
            .with(
                "Edit",
                typed(move |req: EditRequest| {
                    let svc = Arc::clone(&edit);
                    async move { svc.edit(req).await }
                }),
            )
    }
}
