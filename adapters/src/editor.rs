//! External editors.

use crate::AdapterError;
use crate::process::split_command;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Runs an editor on a file.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Opens `path` with the editor command line `command` and waits for the
    /// editor to exit. The editor keeps running if the returned future is
    /// dropped.
    async fn edit(&self, command: &str, path: &Path) -> Result<(), AdapterError>;
}

/// Spawns the configured command line with the path appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEditor;

#[async_trait]
impl Editor for CommandEditor {
    async fn edit(&self, command: &str, path: &Path) -> Result<(), AdapterError> {
        let argv = split_command(command)?;
        let program = argv[0].clone();

        let mut child = Command::new(&program)
            .args(&argv[1..])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| AdapterError::Spawn {
                program: program.clone(),
                source,
            })?;
        tracing::debug!(editor = %program, path = %path.display(), "Editor started");

        // The wait runs on its own task so a cancelled request does not
        // abandon the child mid-edit.
        let waiter = tokio::spawn(async move { child.wait().await });
        let status = waiter
            .await
            .map_err(|e| AdapterError::Io {
                context: format!("waiting for {program}"),
                source: std::io::Error::other(e),
            })?
            .map_err(|source| AdapterError::Io {
                context: format!("waiting for {program}"),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AdapterError::Exit {
                program,
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }
}
