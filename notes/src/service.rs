//! The `Notes` service.

use crate::note::{Note, NoteWithText};
use crate::resolver::NoteResolver;
use adapters::{Clock, Editor};
use async_trait::async_trait;
use config::{Config, SharedConfig};
use errors::{ResultExt, ServiceError};
use plugin::handler::{no_params, typed};
use plugin::{InitError, MethodTable, Plugin, Service};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteQuery {
    pub tag: String,
    pub category: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditRequest {
    pub tag: String,
    pub category: String,
    pub version: String,
    pub background: bool,
}

/// A configured category as reported by `Notes.Categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub dir: String,
    pub suffix: String,
}

/// Registers the note resolver as the `Notes` service. Declines when no
/// categories are configured.
pub struct NotesPlugin {
    editor: Arc<dyn Editor>,
    clock: Arc<dyn Clock>,
}

impl NotesPlugin {
    pub fn new(editor: Arc<dyn Editor>, clock: Arc<dyn Clock>) -> Self {
        Self { editor, clock }
    }
}

impl Plugin for NotesPlugin {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        if config.current().notes.categories.is_empty() {
            return Err(InitError::NotApplicable);
        }
        Ok(Arc::new(NotesService {
            config: config.clone(),
            editor: Arc::clone(&self.editor),
            clock: Arc::clone(&self.clock),
        }))
    }
}

struct NotesService {
    config: SharedConfig,
    editor: Arc<dyn Editor>,
    clock: Arc<dyn Clock>,
}

impl NotesService {
    /// Runs `f` against a resolver over one config snapshot, off the async
    /// threads.
    async fn with_resolver<T, F>(&self, snapshot: Arc<Config>, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&NoteResolver<'_>) -> Result<T, ServiceError> + Send + 'static,
    {
        let clock = Arc::clone(&self.clock);
        tokio::task::spawn_blocking(move || {
            let resolver = NoteResolver::new(&snapshot.notes.categories, clock.as_ref());
            f(&resolver)
        })
        .await
        .internal("note resolver task")?
    }

    async fn list(&self, q: NoteQuery) -> Result<Vec<Note>, ServiceError> {
        self.with_resolver(self.config.current(), move |r| {
            r.list(&q.tag, &q.category, &q.version)
        })
        .await
    }

    async fn read(&self, q: NoteQuery) -> Result<NoteWithText, ServiceError> {
        let note = self
            .with_resolver(self.config.current(), move |r| {
                r.resolve(&q.tag, &q.category, &q.version)
            })
            .await?;
        let bytes = tokio::fs::read(&note.path)
            .await
            .internal(format!("reading {}", note.path.display()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(NoteWithText { note, text })
    }

    async fn edit(&self, req: EditRequest) -> Result<(), ServiceError> {
        let snapshot = self.config.current();
        let Some(command) = snapshot.edit.command.clone().filter(|c| !c.trim().is_empty()) else {
            return Err(ServiceError::internal("Notes.Edit", "no editor is configured"));
        };
        let touch_new = snapshot.edit.touch_new;

        let note = self
            .with_resolver(snapshot, move |r| {
                r.resolve(&req.tag, &req.category, &req.version)
            })
            .await?;
        if touch_new {
            touch(&note.path).await?;
        }

        let editor = Arc::clone(&self.editor);
        if req.background {
            info!(path = %note.path.display(), "Editing note in background");
            tokio::spawn(async move {
                match editor.edit(&command, &note.path).await {
                    Ok(()) => debug!(path = %note.path.display(), "Background edit finished"),
                    Err(e) => error!(
                        path = %note.path.display(),
                        error = %e,
                        "Background edit failed"
                    ),
                }
            });
            return Ok(());
        }

        debug!(path = %note.path.display(), "Editing note");
        editor.edit(&command, &note.path).await?;
        Ok(())
    }

    fn categories(&self) -> Vec<CategoryInfo> {
        self.config
            .current()
            .notes
            .categories
            .iter()
            .map(|c| CategoryInfo {
                name: c.name.clone(),
                dir: c.dir.clone(),
                suffix: c.effective_suffix(),
            })
            .collect()
    }
}

/// Creates `path` (and its directory) if it does not exist yet.
async fn touch(path: &Path) -> Result<(), ServiceError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .internal(format!("creating {}", dir.display()))?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .internal(format!("creating {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl Service for NotesService {
    fn methods(self: Arc<Self>) -> MethodTable {
        let list = Arc::clone(&self);
        let read = Arc::clone(&self);
        let edit = Arc::clone(&self);
        let categories = self;
        MethodTable::new()
            .with(
                "List",
                typed(move |q: NoteQuery| {
                    let svc = Arc::clone(&list);
                    async move { svc.list(q).await }
                }),
            )
            .with(
                "Read",
                typed(move |q: NoteQuery| {
                    let svc = Arc::clone(&read);
                    async move { svc.read(q).await }
                }),
            )
            .with(
                "Edit",
                typed(move |req: EditRequest| {
                    let svc = Arc::clone(&edit);
                    async move { svc.edit(req).await }
                }),
            )
            .with(
                "Categories",
                no_params(move || {
                    let svc = Arc::clone(&categories);
                    async move { Ok::<_, ServiceError>(svc.categories()) }
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin::{Dispatcher, PluginRegistry};
    use serde_json::{Value, json};
    use testing::{FixedClock, NotesDir, ScriptedEditor};

    fn compose(config: Config, editor: Arc<ScriptedEditor>) -> Dispatcher {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                "Notes",
                NotesPlugin::new(editor, Arc::new(FixedClock::ymd(2024, 3, 7))),
            )
            .unwrap();
        registry.compose(&SharedConfig::new(config)).unwrap()
    }

    fn config_for(fx: &NotesDir) -> Config {
        let mut config = Config::default();
        config.notes.categories = fx.categories();
        config.edit.command = Some("vi".to_string());
        config
    }

    #[test]
    fn test_declines_without_categories() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                "Notes",
                NotesPlugin::new(
                    Arc::new(ScriptedEditor::new()),
                    Arc::new(FixedClock::ymd(2024, 3, 7)),
                ),
            )
            .unwrap();
        let d = registry.compose(&SharedConfig::new(Config::default())).unwrap();
        assert!(d.services().is_empty());
    }

    #[tokio::test]
    async fn test_list_and_read() {
        let fx = NotesDir::new(&["work"]);
        fx.write("work", "standup-20240101.txt", "monday");
        fx.write("work", "standup-20240102.txt", "tuesday");
        let d = compose(config_for(&fx), Arc::new(ScriptedEditor::new()));

        let listed = d.dispatch("Notes.List", json!({"tag": "standup"})).await.unwrap();
        let listed: Vec<Note> = serde_json::from_value(listed).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].version, "2024-01-01");

        let read = d.dispatch("Notes.Read", json!({"tag": "standup"})).await.unwrap();
        let read: NoteWithText = serde_json::from_value(read).unwrap();
        assert_eq!(read.text, "tuesday");
        assert_eq!(read.note.version, "2024-01-02");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let fx = NotesDir::new(&["work"]);
        let d = compose(config_for(&fx), Arc::new(ScriptedEditor::new()));
        let err = d
            .dispatch("Notes.Read", json!({"tag": "nothing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_categories_in_configured_order() {
        let fx = NotesDir::new(&["work", "home"]);
        let d = compose(config_for(&fx), Arc::new(ScriptedEditor::new()));
        let out = d.dispatch("Notes.Categories", Value::Null).await.unwrap();
        let cats: Vec<CategoryInfo> = serde_json::from_value(out).unwrap();
        let names: Vec<_> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["work", "home"]);
        assert_eq!(cats[0].suffix, ".txt");
    }

    #[tokio::test]
    async fn test_edit_new_touches_and_runs_editor() {
        let fx = NotesDir::new(&["work"]);
        let editor = Arc::new(ScriptedEditor::new());
        let mut config = config_for(&fx);
        config.edit.touch_new = true;
        let d = compose(config, Arc::clone(&editor));

        let out = d
            .dispatch(
                "Notes.Edit",
                json!({"tag": "standup", "category": "work", "version": "new"}),
            )
            .await
            .unwrap();
        assert_eq!(out, Value::Null);

        let expected = fx.path("work").join("standup-20240307.txt");
        assert!(expected.exists());
        let calls = editor.calls();
        assert_eq!(calls, vec![("vi".to_string(), expected)]);
    }

    #[tokio::test]
    async fn test_edit_without_touch_leaves_file_absent() {
        let fx = NotesDir::new(&["work"]);
        let editor = Arc::new(ScriptedEditor::new());
        let d = compose(config_for(&fx), Arc::clone(&editor));

        d.dispatch(
            "Notes.Edit",
            json!({"tag": "standup", "category": "work", "version": "new"}),
        )
        .await
        .unwrap();
        assert!(!fx.path("work").join("standup-20240307.txt").exists());
        assert_eq!(editor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_without_editor_is_internal() {
        let fx = NotesDir::new(&["work"]);
        let mut config = config_for(&fx);
        config.edit.command = None;
        let d = compose(config, Arc::new(ScriptedEditor::new()));
        let err = d
            .dispatch(
                "Notes.Edit",
                json!({"tag": "x", "category": "work", "version": "new"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_edit_failure_surfaces_unless_background() {
        let fx = NotesDir::new(&["work"]);
        let editor = Arc::new(ScriptedEditor::failing());
        let d = compose(config_for(&fx), Arc::clone(&editor));

        let args = json!({"tag": "x", "category": "work", "version": "new"});
        let err = d.dispatch("Notes.Edit", args).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));

        let args = json!({"tag": "x", "category": "work", "version": "new", "background": true});
        let out = d.dispatch("Notes.Edit", args).await.unwrap();
        assert_eq!(out, Value::Null);
    }

    #[tokio::test]
    async fn test_category_dir_env_expansion() {
        let fx = NotesDir::new(&["work"]);
        fx.write("work", "a-20240101.txt", "expanded");
        let mut config = config_for(&fx);
        // SAFETY: test-local variable name, not read elsewhere.
        unsafe { std::env::set_var("NOTES_SERVICE_TEST_ROOT", fx.root()) };
        config.notes.categories[0].dir = "${NOTES_SERVICE_TEST_ROOT}/work".to_string();
        let d = compose(config, Arc::new(ScriptedEditor::new()));

        let read = d.dispatch("Notes.Read", json!({"tag": "a"})).await.unwrap();
        assert_eq!(read["text"], json!("expanded"));
        unsafe { std::env::remove_var("NOTES_SERVICE_TEST_ROOT") };
    }
}
