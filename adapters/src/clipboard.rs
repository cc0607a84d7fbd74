//! The live system clipboard.

use crate::AdapterError;
use crate::process::{run_checked, split_command};
use async_trait::async_trait;
use config::ClipConfig;

/// Read and write access to the system clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn read(&self) -> Result<Vec<u8>, AdapterError>;

    /// Replaces the clipboard content; an empty slice clears it.
    async fn write(&self, data: &[u8]) -> Result<(), AdapterError>;
}

/// A clipboard driven by a pair of external programs.
///
/// Defaults to `pbcopy` and `pbpaste`; `clip.copyCommand` and
/// `clip.pasteCommand` override them (for example `wl-copy` / `wl-paste -n`).
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    copy: Vec<String>,
    paste: Vec<String>,
}

impl CommandClipboard {
    pub fn new(copy: Vec<String>, paste: Vec<String>) -> Self {
        Self { copy, paste }
    }

    pub fn from_config(clip: &ClipConfig) -> Result<Self, AdapterError> {
        let copy = split_command(clip.copy_command.as_deref().unwrap_or("pbcopy"))?;
        let paste = split_command(clip.paste_command.as_deref().unwrap_or("pbpaste"))?;
        Ok(Self { copy, paste })
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn read(&self) -> Result<Vec<u8>, AdapterError> {
        run_checked(&self.paste, None).await
    }

    async fn write(&self, data: &[u8]) -> Result<(), AdapterError> {
        run_checked(&self.copy, Some(data)).await.map(|_| ())
    }
}
