//! Visual and spoken notifications.

use crate::process::run_checked;
use crate::{AdapterError, applescript_quote};
use async_trait::async_trait;

/// A desktop notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    /// Sound to play, if any.
    pub sound: Option<String>,
}

/// Posts notifications and speaks text.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, notification: &Notification) -> Result<(), AdapterError>;

    async fn say(&self, text: &str, voice: &str) -> Result<(), AdapterError>;
}

/// Uses `osascript` for notifications and `say` for speech.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsaScriptNotifier;

impl OsaScriptNotifier {
    fn script(n: &Notification) -> String {
        let mut program = vec![
            format!("display notification {}", applescript_quote(&n.body)),
            format!("with title {}", applescript_quote(&n.title)),
        ];
        if !n.subtitle.is_empty() {
            program.push(format!("subtitle {}", applescript_quote(&n.subtitle)));
        }
        if let Some(sound) = &n.sound {
            program.push(format!("sound name {}", applescript_quote(sound)));
        }
        program.join(" ")
    }
}

#[async_trait]
impl Notifier for OsaScriptNotifier {
    async fn post(&self, notification: &Notification) -> Result<(), AdapterError> {
        let script = Self::script(notification);
        run_checked(&["osascript".to_string()], Some(script.as_bytes()))
            .await
            .map(|_| ())
    }

    async fn say(&self, text: &str, voice: &str) -> Result<(), AdapterError> {
        let argv = ["say".to_string(), "-v".to_string(), voice.to_string()];
        run_checked(&argv, Some(text.as_bytes())).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_minimal() {
        let script = OsaScriptNotifier::script(&Notification {
            title: "Build".to_string(),
            body: "done".to_string(),
            ..Notification::default()
        });
        assert_eq!(script, r#"display notification "done" with title "Build""#);
    }

    #[test]
    fn test_script_with_subtitle_and_sound() {
        let script = OsaScriptNotifier::script(&Notification {
            title: "T".to_string(),
            subtitle: "S".to_string(),
            body: "B".to_string(),
            sound: Some("Glass".to_string()),
        });
        assert_eq!(
            script,
            r#"display notification "B" with title "T" subtitle "S" sound name "Glass""#
        );
    }
}
