use config::NoteCategory;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with one subdirectory per note category.
///
/// Removed when dropped. Helpers panic on I/O failure; they are for tests.
pub struct NotesDir {
    root: TempDir,
    names: Vec<String>,
}

impl NotesDir {
    pub fn new(categories: &[&str]) -> Self {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("creating temp dir: {e}"));
        for name in categories {
            let dir = root.path().join(name);
            std::fs::create_dir_all(&dir)
                .unwrap_or_else(|e| panic!("creating {}: {e}", dir.display()));
        }
        tracing::debug!(root = %root.path().display(), "Notes fixture created");
        Self {
            root,
            names: categories.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Directory of category `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// One `.txt` category per directory, in creation order.
    pub fn categories(&self) -> Vec<NoteCategory> {
        self.names
            .iter()
            .map(|name| NoteCategory::new(name.as_str(), self.path(name).display().to_string(), ".txt"))
            .collect()
    }

    /// Creates an empty file.
    pub fn touch(&self, category: &str, file: &str) -> PathBuf {
        self.write(category, file, "")
    }

    pub fn write(&self, category: &str, file: &str, text: &str) -> PathBuf {
        let path = self.path(category).join(file);
        std::fs::write(&path, text).unwrap_or_else(|e| panic!("writing {}: {e}", path.display()));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_dir_layout() {
        let fx = NotesDir::new(&["work", "home"]);
        assert!(fx.path("work").is_dir());
        let path = fx.write("home", "a-20240101.txt", "hi");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hi");

        let cats = fx.categories();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].name, "work");
        assert_eq!(cats[1].expanded_dir(), fx.path("home"));
    }
}
