use clip::ClipPlugin;
use config::{Config, SharedConfig};
use errors::ServiceError;
use notes::NotesPlugin;
use plugin::{Dispatcher, PluginRegistry};
use relays::{HmacDeriver, KeyPlugin, NotifyPlugin, UserPlugin};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use testing::{
    FixedClock, MemoryClipboard, NotesDir, RecordingNotifier, ScriptedEditor, ScriptedPrompter,
};

struct Daemon {
    dispatcher: Dispatcher,
    config: SharedConfig,
    board: Arc<MemoryClipboard>,
}

fn start(config: Config, board: Arc<MemoryClipboard>, prompter: ScriptedPrompter) -> Daemon {
    let prompter = Arc::new(prompter);
    let editor = Arc::new(ScriptedEditor::new());
    let mut registry = PluginRegistry::new();
    registry.register("Clip", ClipPlugin::new(board.clone())).unwrap();
    registry
        .register(
            "Notes",
            NotesPlugin::new(editor.clone(), Arc::new(FixedClock::ymd(2024, 6, 1))),
        )
        .unwrap();
    registry
        .register("Notify", NotifyPlugin::new(Arc::new(RecordingNotifier::new())))
        .unwrap();
    registry
        .register("User", UserPlugin::new(prompter.clone(), editor))
        .unwrap();
    registry
        .register(
            "Key",
            KeyPlugin::new(prompter, board.clone(), Arc::new(HmacDeriver)),
        )
        .unwrap();

    let config = SharedConfig::new(config);
    let dispatcher = registry.compose(&config).unwrap();
    Daemon {
        dispatcher,
        config,
        board,
    }
}

#[test]
fn minimal_config_activates_always_on_services() {
    let d = start(
        Config::default(),
        Arc::new(MemoryClipboard::new(b"")),
        ScriptedPrompter::new(),
    );
    assert_eq!(d.dispatcher.services(), vec!["Clip", "Notify", "User"]);
}

#[test]
fn full_config_activates_everything() {
    let fx = NotesDir::new(&["work"]);
    let dir = tempfile::tempdir().unwrap();
    let keys = dir.path().join("keys.yaml");
    std::fs::write(&keys, "sites:\n  example.com: {}\n").unwrap();

    let mut config = Config::default();
    config.notes.categories = fx.categories();
    config.key.config_file = Some(keys.display().to_string());
    let d = start(config, Arc::new(MemoryClipboard::new(b"")), ScriptedPrompter::new());
    assert_eq!(
        d.dispatcher.services(),
        vec!["Clip", "Key", "Notes", "Notify", "User"]
    );
    assert!(d.dispatcher.methods().contains(&"Notes.Categories".to_string()));
}

fn clips_config(path: &PathBuf) -> Config {
    let mut config = Config::default();
    config.clip.save_file = Some(path.display().to_string());
    config
}

#[tokio::test]
async fn clips_survive_restart_and_never_store_active() {
    let dir = tempfile::tempdir().unwrap();
    let save = dir.path().join("clips.json");

    {
        let d = start(
            clips_config(&save),
            Arc::new(MemoryClipboard::new(b"before")),
            ScriptedPrompter::new(),
        );
        d.dispatcher
            .dispatch(
                "Clip.Set",
                json!({"tag": "greeting", "save": "prior", "data": "aGVsbG8="}),
            )
            .await
            .unwrap();
        assert_eq!(d.board.contents(), b"hello");
    }

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&save).unwrap()).unwrap();
    let keys: Vec<_> = raw.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["greeting", "prior"]);

    let d = start(
        clips_config(&save),
        Arc::new(MemoryClipboard::new(b"")),
        ScriptedPrompter::new(),
    );
    let tags = d.dispatcher.dispatch("Clip.List", Value::Null).await.unwrap();
    assert_eq!(tags, json!(["active", "greeting", "prior"]));

    let prior = d
        .dispatcher
        .dispatch("Clip.Get", json!({"tag": "prior", "activate": true}))
        .await
        .unwrap();
    assert_eq!(prior, json!("YmVmb3Jl"));
    assert_eq!(d.board.contents(), b"before");
}

#[tokio::test]
async fn key_copy_goes_through_the_shared_clipboard() {
    let dir = tempfile::tempdir().unwrap();
    let keys = dir.path().join("keys.yaml");
    std::fs::write(&keys, "default:\n  length: 10\n").unwrap();
    let mut config = Config::default();
    config.key.config_file = Some(keys.display().to_string());

    let d = start(
        config,
        Arc::new(MemoryClipboard::new(b"")),
        ScriptedPrompter::new().answer("s3cret"),
    );
    let reply = d
        .dispatcher
        .dispatch("Key.Generate", json!({"host": "example.com", "copy": true}))
        .await
        .unwrap();
    assert_eq!(reply["key"], json!(""));

    let live = d.dispatcher.dispatch("Clip.Get", json!({})).await.unwrap();
    let live = live.as_str().unwrap().to_string();
    assert!(!live.is_empty());
    assert_eq!(d.board.contents().len(), 10);
}

#[tokio::test]
async fn notes_new_then_latest_agree() {
    let fx = NotesDir::new(&["work", "home"]);
    fx.write("home", "plan-20240101.txt", "old plan");
    let mut config = Config::default();
    config.notes.categories = fx.categories();
    config.edit.command = Some("vi".to_string());
    config.edit.touch_new = true;
    let d = start(config, Arc::new(MemoryClipboard::new(b"")), ScriptedPrompter::new());

    d.dispatcher
        .dispatch(
            "Notes.Edit",
            json!({"tag": "plan", "category": "work", "version": "new"}),
        )
        .await
        .unwrap();

    let latest = d
        .dispatcher
        .dispatch("Notes.Read", json!({"tag": "plan"}))
        .await
        .unwrap();
    assert_eq!(latest["note"]["version"], json!("2024-06-01"));
    assert_eq!(latest["note"]["category"], json!("work"));
    assert_eq!(latest["text"], json!(""));

    let err = d
        .dispatcher
        .dispatch("Notes.Edit", json!({"tag": "plan", "version": "new"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest { .. }));
}

#[tokio::test]
async fn reload_swaps_snapshot_for_all_services() {
    let d = start(
        Config::default(),
        Arc::new(MemoryClipboard::new(b"")),
        ScriptedPrompter::new(),
    );

    let mut next = (*d.config.current()).clone();
    next.clip.empty_policy = config::EmptyPolicy::Store;
    d.config.replace(next);
    let summary = d.dispatcher.reload().wait().await;
    assert_eq!(summary.updated, vec!["Clip", "Notify", "User"]);
    assert!(summary.failed.is_empty());

    d.dispatcher
        .dispatch("Clip.Set", json!({"tag": "x", "data": "eA=="}))
        .await
        .unwrap();
    d.dispatcher
        .dispatch("Clip.Set", json!({"tag": "x", "data": "", "allowEmpty": true}))
        .await
        .unwrap();
    let stored = d
        .dispatcher
        .dispatch("Clip.Get", json!({"tag": "x"}))
        .await
        .unwrap();
    assert_eq!(stored, json!(""));
}
