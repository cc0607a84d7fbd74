//! The tag-addressable clip store.

use crate::persist::{self, ClipError, Clips};
use adapters::Clipboard;
use config::EmptyPolicy;
use errors::{ResultExt, ServiceError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tag naming the live system clipboard.
pub const ACTIVE: &str = "active";

fn is_live(tag: &str) -> bool {
    tag.is_empty() || tag == ACTIVE
}

/// Named clips plus access to the live clipboard.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Stores opaque payloads under tags, moves them to and from the live
/// clipboard, and mirrors the stored set to a save file after every
/// mutation.
///
/// ## Locking
/// Two locks, always taken in this order:
/// 1. `live` serializes every capture-then-overwrite of the live clipboard,
///    so a saved snapshot is never taken after a concurrent overwrite.
/// 2. `saved` guards the tag map and the save file.
///
/// ## Consistency
/// A mutation is staged on a copy of the tag map, written to the save file
/// and only then installed. A failed save leaves memory and file as they
/// were. A failed live-clipboard write afterwards restores the prior map.
///
/// ## Usage
/// ```rust,no_run
/// use adapters::CommandClipboard;
/// use clip::ClipStore;
/// use config::{ClipConfig, EmptyPolicy};
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let clipboard = Arc::new(CommandClipboard::from_config(&ClipConfig::default())?);
/// let store = ClipStore::open(clipboard, None, EmptyPolicy::Delete)?;
/// store.set("greeting", "previous", b"hello", false).await?;
/// assert_eq!(store.get("greeting", "", false).await?, b"hello");
/// # Ok(())
/// # }
/// ```
pub struct ClipStore {
    clipboard: Arc<dyn Clipboard>,
    path: Option<PathBuf>,
    policy: parking_lot::RwLock<EmptyPolicy>,
    live: Mutex<()>,
    saved: Mutex<Clips>,
}

impl ClipStore {
    /// Creates a store, loading previously saved clips from `path`.
    ///
    /// ## Error Handling
    /// A missing save file is not an error; an unreadable or undecodable one
    /// is.
    pub fn open(
        clipboard: Arc<dyn Clipboard>,
        path: Option<PathBuf>,
        policy: EmptyPolicy,
    ) -> Result<Self, ClipError> {
        let saved = match &path {
            Some(p) => {
                let clips = persist::load(p)?;
                info!(path = %p.display(), clips = clips.len(), "Loaded saved clips");
                clips
            }
            None => Clips::new(),
        };
        Ok(Self {
            clipboard,
            path,
            policy: parking_lot::RwLock::new(policy),
            live: Mutex::new(()),
            saved: Mutex::new(saved),
        })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn set_empty_policy(&self, policy: EmptyPolicy) {
        *self.policy.write() = policy;
    }

    /// Writes the tag map to the save file, if one is configured. The caller
    /// holds the `saved` lock.
    async fn persist(&self, clips: &Clips) -> Result<(), ServiceError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let contents = persist::encode(clips).internal("encoding clips")?;
        let context = format!("saving clips to {}", path.display());
        tokio::task::spawn_blocking(move || persist::write_atomic(&path, &contents))
            .await
            .internal(context.clone())?
            .internal(context)
    }

    /// Saves `next` and installs it in `saved`, returning the replaced map.
    /// `saved` is untouched when the save fails.
    async fn commit(&self, saved: &mut Clips, next: Clips) -> Result<Clips, ServiceError> {
        if next != *saved {
            self.persist(&next).await?;
        }
        Ok(std::mem::replace(saved, next))
    }

    /// Puts `previous` back after a later step of a mutation failed.
    async fn restore(&self, saved: &mut Clips, previous: Clips) {
        if previous != *saved {
            if let Err(e) = self.persist(&previous).await {
                warn!(error = %e, "Restoring clip file failed");
            }
        }
        *saved = previous;
    }

    async fn read_live(&self) -> Result<Vec<u8>, ServiceError> {
        Ok(self.clipboard.read().await?)
    }

    async fn write_live(&self, data: &[u8]) -> Result<(), ServiceError> {
        Ok(self.clipboard.write(data).await?)
    }

    /// Puts `data` on the live clipboard and optionally stores it.
    ///
    /// - When `save` is non-empty the previous live content is captured
    ///   under `save` first.
    /// - When `tag` names a slot, `data` is stored there. An empty `data`
    ///   removes the slot under [`EmptyPolicy::Delete`].
    ///
    /// ## Error Handling
    /// `InvalidRequest` for empty `data` without `allow_empty`, for
    /// `tag == save`, and for `save == "active"`.
    pub async fn set(
        &self,
        tag: &str,
        save: &str,
        data: &[u8],
        allow_empty: bool,
    ) -> Result<bool, ServiceError> {
        if data.is_empty() && !allow_empty {
            return Err(ServiceError::invalid_request("empty clip data"));
        }
        if !tag.is_empty() && tag == save {
            return Err(ServiceError::invalid_request("tag and save are equal"));
        }
        if save == ACTIVE {
            return Err(ServiceError::invalid_request(format!(
                "{ACTIVE:?} cannot be used as a save tag"
            )));
        }

        let _live = self.live.lock().await;
        let captured = if save.is_empty() {
            None
        } else {
            Some(self.read_live().await?)
        };

        let mut saved = self.saved.lock().await;
        let mut next = saved.clone();
        if !is_live(tag) {
            if data.is_empty() && *self.policy.read() == EmptyPolicy::Delete {
                next.remove(tag);
            } else {
                next.insert(tag.to_string(), data.to_vec());
            }
        }
        if let Some(previous) = captured {
            next.insert(save.to_string(), previous);
        }
        let previous = self.commit(&mut saved, next).await?;

        if let Err(e) = self.write_live(data).await {
            self.restore(&mut saved, previous).await;
            return Err(e);
        }
        debug!(tag, save, bytes = data.len(), "Set clip");
        Ok(true)
    }

    /// Returns the payload stored under `tag`, or the live clipboard for an
    /// empty or `"active"` tag.
    ///
    /// With `activate`, the payload also becomes the live clipboard content;
    /// when `save` is non-empty the previous live content is stored there
    /// first.
    ///
    /// ## Error Handling
    /// `InvalidRequest` for `activate` with `tag == save` or with
    /// `save == "active"`; `NotFound` for an unknown tag.
    pub async fn get(&self, tag: &str, save: &str, activate: bool) -> Result<Vec<u8>, ServiceError> {
        if is_live(tag) {
            return self.read_live().await;
        }
        if activate && tag == save {
            return Err(ServiceError::invalid_request("tag and save are equal"));
        }
        if activate && save == ACTIVE {
            return Err(ServiceError::invalid_request(format!(
                "{ACTIVE:?} cannot be used as a save tag"
            )));
        }

        if !activate {
            let saved = self.saved.lock().await;
            return saved
                .get(tag)
                .cloned()
                .ok_or_else(|| ServiceError::not_found(format!("tag {tag:?} not found")));
        }

        let _live = self.live.lock().await;
        let mut saved = self.saved.lock().await;
        let data = saved
            .get(tag)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("tag {tag:?} not found")))?;
        let mut next = saved.clone();
        if !save.is_empty() {
            next.insert(save.to_string(), self.read_live().await?);
        }
        let previous = self.commit(&mut saved, next).await?;

        if let Err(e) = self.write_live(&data).await {
            self.restore(&mut saved, previous).await;
            return Err(e);
        }
        debug!(tag, "Activated clip");
        Ok(data)
    }

    /// Stored tags plus `"active"`, sorted.
    pub async fn list(&self) -> Vec<String> {
        let saved = self.saved.lock().await;
        let mut tags: Vec<String> = saved.keys().cloned().collect();
        if let Err(pos) = tags.binary_search_by(|t| t.as_str().cmp(ACTIVE)) {
            tags.insert(pos, ACTIVE.to_string());
        }
        tags
    }

    /// Removes `tag` and reports whether it existed. An empty or `"active"`
    /// tag clears the live clipboard instead.
    pub async fn clear(&self, tag: &str) -> Result<bool, ServiceError> {
        if is_live(tag) {
            let _live = self.live.lock().await;
            self.write_live(&[]).await?;
            return Ok(true);
        }
        let mut saved = self.saved.lock().await;
        let mut next = saved.clone();
        let existed = next.remove(tag).is_some();
        self.commit(&mut saved, next).await?;
        Ok(existed)
    }
}

impl std::fmt::Debug for ClipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipStore")
            .field("path", &self.path)
            .field("policy", &*self.policy.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::MemoryClipboard;

    fn store(board: &Arc<MemoryClipboard>) -> ClipStore {
        ClipStore::open(board.clone(), None, EmptyPolicy::Delete).unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let board = Arc::new(MemoryClipboard::new(b"old"));
        let clips = store(&board);

        assert!(clips.set("x", "", b"hello", false).await.unwrap());
        assert_eq!(board.contents(), b"hello");
        assert_eq!(clips.get("x", "", false).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_set_saves_previous_content() {
        let board = Arc::new(MemoryClipboard::new(b"P"));
        let clips = store(&board);

        clips.set("x", "prev", b"Q", false).await.unwrap();
        assert_eq!(clips.get("prev", "", false).await.unwrap(), b"P");
        assert_eq!(clips.get("x", "", false).await.unwrap(), b"Q");
        assert_eq!(board.contents(), b"Q");
    }

    #[tokio::test]
    async fn test_set_validation() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);

        let empty = clips.set("x", "", b"", false).await.unwrap_err();
        assert!(matches!(empty, ServiceError::InvalidRequest { .. }));
        let same = clips.set("x", "x", b"d", false).await.unwrap_err();
        assert!(matches!(same, ServiceError::InvalidRequest { .. }));
        let active = clips.set("x", ACTIVE, b"d", false).await.unwrap_err();
        assert!(matches!(active, ServiceError::InvalidRequest { .. }));
        assert_eq!(board.writes(), 0);
    }

    #[tokio::test]
    async fn test_set_active_tag_only_touches_clipboard() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);

        clips.set(ACTIVE, "", b"live", false).await.unwrap();
        assert_eq!(board.contents(), b"live");
        assert_eq!(clips.list().await, vec![ACTIVE]);
    }

    #[tokio::test]
    async fn test_empty_payload_deletes_by_default() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);

        clips.set("x", "", b"data", false).await.unwrap();
        clips.set("x", "", b"", true).await.unwrap();
        let err = clips.get("x", "", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_payload_stored_under_store_policy() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = ClipStore::open(board.clone(), None, EmptyPolicy::Store).unwrap();

        clips.set("x", "", b"data", false).await.unwrap();
        clips.set("x", "", b"", true).await.unwrap();
        assert_eq!(clips.get("x", "", false).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn test_get_live_clipboard() {
        let board = Arc::new(MemoryClipboard::new(b"live"));
        let clips = store(&board);
        assert_eq!(clips.get("", "", false).await.unwrap(), b"live");
        assert_eq!(clips.get(ACTIVE, "", true).await.unwrap(), b"live");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        let err = clips.get("nope", "", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_activate_checks_arguments_before_lookup() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        let err = clips.get("nope", "nope", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest { .. }));
        let err = clips.get("nope", ACTIVE, true).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_get_activate_swaps_clipboard() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        clips.set("x", "", b"stored", false).await.unwrap();
        board.set_contents(b"current");

        let data = clips.get("x", "backup", true).await.unwrap();
        assert_eq!(data, b"stored");
        assert_eq!(board.contents(), b"stored");
        assert_eq!(clips.get("backup", "", false).await.unwrap(), b"current");
    }

    #[tokio::test]
    async fn test_get_without_activate_leaves_clipboard() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        clips.set("x", "", b"stored", false).await.unwrap();
        board.set_contents(b"current");

        clips.get("x", "backup", false).await.unwrap();
        assert_eq!(board.contents(), b"current");
        assert!(!clips.list().await.contains(&"backup".to_string()));
    }

    #[tokio::test]
    async fn test_list_includes_active_sorted() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        clips.set("zeta", "", b"z", false).await.unwrap();
        clips.set("alpha", "", b"a", false).await.unwrap();

        assert_eq!(clips.list().await, vec!["active", "alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let board = Arc::new(MemoryClipboard::new(b"live"));
        let clips = store(&board);
        clips.set("x", "", b"data", false).await.unwrap();

        assert!(clips.clear("x").await.unwrap());
        assert!(!clips.clear("x").await.unwrap());
        assert!(clips.clear("").await.unwrap());
        assert_eq!(board.contents(), b"");
    }

    #[tokio::test]
    async fn test_failed_clipboard_write_stores_nothing() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store(&board);
        board.fail_writes(true);

        let err = clips.set("x", "", b"data", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
        assert_eq!(clips.list().await, vec![ACTIVE]);
    }

    /// A store whose save file sits in a directory that is removed once the
    /// store holds clip `x`.
    async fn store_with_lost_save_dir(board: &Arc<MemoryClipboard>) -> ClipStore {
        let dir = tempfile::tempdir().unwrap();
        let clips = ClipStore::open(
            board.clone(),
            Some(dir.path().join("clips.json")),
            EmptyPolicy::Delete,
        )
        .unwrap();
        clips.set("x", "", b"data", false).await.unwrap();
        dir.close().unwrap();
        clips
    }

    #[tokio::test]
    async fn test_set_persist_failure_leaves_state_unchanged() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store_with_lost_save_dir(&board).await;
        board.set_contents(b"live");
        let writes = board.writes();

        let err = clips.set("y", "prev", b"new", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
        assert_eq!(clips.list().await, vec!["active", "x"]);
        assert_eq!(board.contents(), b"live");
        assert_eq!(board.writes(), writes);
    }

    #[tokio::test]
    async fn test_clear_persist_failure_keeps_clip() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store_with_lost_save_dir(&board).await;

        let err = clips.clear("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
        assert_eq!(clips.get("x", "", false).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_activate_persist_failure_leaves_clipboard() {
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips = store_with_lost_save_dir(&board).await;
        board.set_contents(b"live");

        let err = clips.get("x", "backup", true).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
        assert_eq!(board.contents(), b"live");
        assert_eq!(clips.list().await, vec!["active", "x"]);
    }

    #[tokio::test]
    async fn test_failed_clipboard_write_restores_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.json");
        let board = Arc::new(MemoryClipboard::new(b""));
        let clips =
            ClipStore::open(board.clone(), Some(path.clone()), EmptyPolicy::Delete).unwrap();
        clips.set("x", "", b"data", false).await.unwrap();
        board.fail_writes(true);

        let err = clips.set("y", "", b"more", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));
        assert_eq!(clips.list().await, vec!["active", "x"]);
        let on_disk = persist::load(&path).unwrap();
        assert_eq!(on_disk.keys().collect::<Vec<_>>(), ["x"]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_capture_distinct_content() {
        let board = Arc::new(MemoryClipboard::new(b"P"));
        let clips = Arc::new(store(&board));

        let a = {
            let clips = Arc::clone(&clips);
            tokio::spawn(async move { clips.set("a", "sa", b"A", false).await })
        };
        let b = {
            let clips = Arc::clone(&clips);
            tokio::spawn(async move { clips.set("b", "sb", b"B", false).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let sa = clips.get("sa", "", false).await.unwrap();
        let sb = clips.get("sb", "", false).await.unwrap();
        let last = board.contents();
        // One save saw the original content; the other saw the first writer's.
        let mut seen = vec![sa, sb];
        seen.sort();
        if last == b"B" {
            assert_eq!(seen, vec![b"A".to_vec(), b"P".to_vec()]);
        } else {
            assert_eq!(last, b"A");
            assert_eq!(seen, vec![b"B".to_vec(), b"P".to_vec()]);
        }
    }
}
