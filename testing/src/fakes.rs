use adapters::{AdapterError, Clipboard, Clock, Editor, Notification, Notifier, Prompter, TextPrompt};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

fn scripted_failure(program: &str) -> AdapterError {
    AdapterError::Exit {
        program: program.to_string(),
        status: "exit status: 1".to_string(),
        stderr: "scripted failure".to_string(),
    }
}

/// A clipboard held in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Vec<u8>>,
    writes: Mutex<usize>,
    fail_writes: Mutex<bool>,
}

impl MemoryClipboard {
    pub fn new(initial: &[u8]) -> Self {
        Self {
            contents: Mutex::new(initial.to_vec()),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().clone()
    }

    /// Replaces the contents without counting as a write, like a copy made
    /// in another application.
    pub fn set_contents(&self, data: &[u8]) {
        *self.contents.lock() = data.to_vec();
    }

    /// Number of successful writes through [`Clipboard::write`].
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn read(&self) -> Result<Vec<u8>, AdapterError> {
        tokio::task::yield_now().await;
        Ok(self.contents())
    }

    async fn write(&self, data: &[u8]) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        if *self.fail_writes.lock() {
            return Err(scripted_failure("memory-clipboard"));
        }
        *self.contents.lock() = data.to_vec();
        *self.writes.lock() += 1;
        Ok(())
    }
}

/// A clock stuck on one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    /// # Panics
    /// On an invalid date.
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Self(date),
            None => panic!("invalid date {year}-{month}-{day}"),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Answers prompts from a queue and records what was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Result<String, ()>>>,
    asked: Mutex<Vec<TextPrompt>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an answer.
    pub fn answer(self, text: impl Into<String>) -> Self {
        self.answers.lock().push_back(Ok(text.into()));
        self
    }

    /// Queues a dismissal.
    pub fn cancel(self) -> Self {
        self.answers.lock().push_back(Err(()));
        self
    }

    pub fn asked(&self) -> Vec<TextPrompt> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn prompt_text(&self, request: &TextPrompt) -> Result<String, AdapterError> {
        self.asked.lock().push(request.clone());
        match self.answers.lock().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(())) => Err(AdapterError::Cancelled),
            None => Err(AdapterError::UnexpectedOutput {
                program: "scripted-prompter".to_string(),
                detail: "no answer queued".to_string(),
            }),
        }
    }
}

/// Something a [`RecordingNotifier`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Posted(Notification),
    Spoken { text: String, voice: String },
}

/// Records notifications instead of showing them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Delivery> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, notification: &Notification) -> Result<(), AdapterError> {
        self.delivered
            .lock()
            .push(Delivery::Posted(notification.clone()));
        Ok(())
    }

    async fn say(&self, text: &str, voice: &str) -> Result<(), AdapterError> {
        self.delivered.lock().push(Delivery::Spoken {
            text: text.to_string(),
            voice: voice.to_string(),
        });
        Ok(())
    }
}

/// Records editor invocations and optionally rewrites the file.
#[derive(Debug, Default)]
pub struct ScriptedEditor {
    calls: Mutex<Vec<(String, PathBuf)>>,
    replacement: Option<Vec<u8>>,
    fail: bool,
}

impl ScriptedEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An editor that replaces the file's contents with `data`.
    pub fn writing(data: &[u8]) -> Self {
        Self {
            replacement: Some(data.to_vec()),
            ..Self::default()
        }
    }

    /// An editor that exits non-zero.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(command, path)` for every invocation, in order.
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Editor for ScriptedEditor {
    async fn edit(&self, command: &str, path: &Path) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .push((command.to_string(), path.to_path_buf()));
        if self.fail {
            return Err(scripted_failure(command));
        }
        if let Some(data) = &self.replacement {
            tokio::fs::write(path, data)
                .await
                .map_err(|source| AdapterError::Io {
                    context: format!("writing {}", path.display()),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_clipboard_counts_writes() {
        let board = MemoryClipboard::new(b"a");
        board.set_contents(b"b");
        assert_eq!(board.writes(), 0);
        board.write(b"c").await.unwrap();
        assert_eq!(board.read().await.unwrap(), b"c");
        assert_eq!(board.writes(), 1);

        board.fail_writes(true);
        assert!(board.write(b"d").await.is_err());
        assert_eq!(board.contents(), b"c");
    }

    #[tokio::test]
    async fn test_scripted_prompter_queue() {
        let prompter = ScriptedPrompter::new().answer("one").cancel();
        let req = TextPrompt {
            prompt: "?".to_string(),
            default: String::new(),
            hide: false,
        };
        assert_eq!(prompter.prompt_text(&req).await.unwrap(), "one");
        assert!(matches!(
            prompter.prompt_text(&req).await,
            Err(AdapterError::Cancelled)
        ));
        assert!(prompter.prompt_text(&req).await.is_err());
        assert_eq!(prompter.asked().len(), 3);
    }
}
