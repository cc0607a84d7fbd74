use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A note file discovered on disk (or, for a new note, about to be).
///
/// Ordering is by tag, version, category, suffix, then path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Note {
    pub tag: String,
    /// `YYYY-MM-DD`
    pub version: String,
    pub category: String,
    /// File suffix including the leading dot
    pub suffix: String,
    pub path: PathBuf,
}

/// A note together with its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithText {
    pub note: Note,
    pub text: String,
}
