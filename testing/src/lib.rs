//! Shared test fixtures for the notifier workspace.
//!
//! In-memory stand-ins for every OS delegate, so services can be exercised
//! without a desktop session:
//! - [`MemoryClipboard`] for the live clipboard
//! - [`FixedClock`] for "today"
//! - [`ScriptedPrompter`] for text dialogs
//! - [`RecordingNotifier`] for notifications and speech
//! - [`ScriptedEditor`] for external editors
//!
//! Plus [`NotesDir`], a temporary tree of note category directories.

mod fakes;
mod fixtures;

pub use fakes::*;
pub use fixtures::*;
