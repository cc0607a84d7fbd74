//! Interactive text prompts.

use crate::process::run;
use crate::{AdapterError, applescript_quote};
use async_trait::async_trait;

/// A request for a line of text from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPrompt {
    pub prompt: String,
    pub default: String,
    /// Mask the typed text.
    pub hide: bool,
}

/// Asks the user for text.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Returns the entered text, or [`AdapterError::Cancelled`] when the
    /// user dismisses the prompt.
    async fn prompt_text(&self, request: &TextPrompt) -> Result<String, AdapterError>;
}

/// Shows a dialog through `osascript`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsaScriptPrompter;

const PROGRAM: &str = "osascript";
const RETURNED: &str = "text returned:";

impl OsaScriptPrompter {
    fn script(request: &TextPrompt) -> String {
        format!(
            "display dialog {} default answer {} hidden answer {}",
            applescript_quote(&request.prompt),
            applescript_quote(&request.default),
            request.hide
        )
    }
}

/// Extracts the answer from `osascript -s ho` output, which reports both
/// results and errors on stdout.
fn parse_dialog_output(success: bool, raw: &[u8]) -> Result<String, AdapterError> {
    let text = String::from_utf8_lossy(raw);
    let out = text.trim_end_matches('\n');
    if !success {
        if out.contains("User canceled") {
            return Err(AdapterError::Cancelled);
        }
        return Err(AdapterError::UnexpectedOutput {
            program: PROGRAM.to_string(),
            detail: out.to_string(),
        });
    }
    match out.find(RETURNED) {
        Some(i) => Ok(out[i + RETURNED.len()..].to_string()),
        None => Err(AdapterError::UnexpectedOutput {
            program: PROGRAM.to_string(),
            detail: "missing user input".to_string(),
        }),
    }
}

#[async_trait]
impl Prompter for OsaScriptPrompter {
    async fn prompt_text(&self, request: &TextPrompt) -> Result<String, AdapterError> {
        let argv = [PROGRAM.to_string(), "-s".to_string(), "ho".to_string()];
        let script = Self::script(request);
        let output = run(&argv, Some(script.as_bytes())).await?;
        parse_dialog_output(output.status.success(), &output.stdout)
    }
}
