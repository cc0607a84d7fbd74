//! # Adapters
//!
//! OS delegates used by the notifier services.
//!
//! Every delegate sits behind a trait so the services can be exercised with
//! in-memory fakes:
//! - [`Clipboard`]: the live system clipboard
//! - [`Prompter`]: interactive text prompts
//! - [`Notifier`]: visual and spoken notifications
//! - [`Editor`]: an external editor run on a file
//! - [`Clock`]: today's date
//!
//! The command-backed implementations shell out to `pbcopy`/`pbpaste`,
//! `osascript` and `say` unless configured otherwise.

pub mod clipboard;
pub mod clock;
pub mod editor;
pub mod notifier;
pub mod process;
pub mod prompt;

pub use clipboard::{Clipboard, CommandClipboard};
pub use clock::{Clock, SystemClock};
pub use editor::{CommandEditor, Editor};
pub use notifier::{Notification, Notifier, OsaScriptNotifier};
pub use prompt::{OsaScriptPrompter, Prompter, TextPrompt};

use errors::ServiceError;

/// Failure of an OS delegate.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("invalid command line {command:?}: {reason}")]
    BadCommand { command: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected output from {program}: {detail}")]
    UnexpectedOutput { program: String, detail: String },

    #[error("no {what} is configured")]
    NotConfigured { what: String },

    #[error("cancelled by user")]
    Cancelled,
}

impl From<AdapterError> for ServiceError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Cancelled => ServiceError::Cancelled,
            AdapterError::Spawn { ref program, .. }
            | AdapterError::Exit { ref program, .. }
            | AdapterError::UnexpectedOutput { ref program, .. } => {
                ServiceError::internal(program.clone(), &err)
            }
            other => ServiceError::internal("delegate", other),
        }
    }
}

/// Quotes `s` as an AppleScript string literal.
pub(crate) fn applescript_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
