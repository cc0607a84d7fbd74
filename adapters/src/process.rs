//! Helpers for running delegate programs.

use crate::AdapterError;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Splits a configured command line into program and arguments.
pub fn split_command(line: &str) -> Result<Vec<String>, AdapterError> {
    let argv = shell_words::split(line).map_err(|e| AdapterError::BadCommand {
        command: line.to_string(),
        reason: e.to_string(),
    })?;
    if argv.is_empty() {
        return Err(AdapterError::BadCommand {
            command: line.to_string(),
            reason: "empty command line".to_string(),
        });
    }
    Ok(argv)
}

/// Runs `argv` to completion, feeding `stdin` when given, and returns its
/// raw output regardless of exit status.
///
/// The child is killed if the returned future is dropped.
pub async fn run(argv: &[String], stdin: Option<&[u8]>) -> Result<Output, AdapterError> {
    let (program, args) = argv.split_first().ok_or_else(|| AdapterError::BadCommand {
        command: String::new(),
        reason: "empty command line".to_string(),
    })?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| AdapterError::Spawn {
            program: program.clone(),
            source,
        })?;

    if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(data)
            .await
            .map_err(|source| AdapterError::Io {
                context: format!("writing stdin of {program}"),
                source,
            })?;
        drop(pipe);
    }

    child
        .wait_with_output()
        .await
        .map_err(|source| AdapterError::Io {
            context: format!("waiting for {program}"),
            source,
        })
}

/// Like [`run`], but a non-zero exit is an error carrying the program's
/// stderr. Returns stdout.
pub async fn run_checked(argv: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>, AdapterError> {
    let output = run(argv, stdin).await?;
    if output.status.success() {
        tracing::trace!(program = %argv[0], bytes = output.stdout.len(), "Delegate finished");
        Ok(output.stdout)
    } else {
        Err(AdapterError::Exit {
            program: argv[0].clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
