// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::cache::FileCache;
use crate::watch::hash::compute_content_hash;
use crate::watch::patterns::WatchProfile;
use crate::types::{ChangeKind, FileChangeEvent};

/// Files larger than this are forwarded without content; the backend has
/// nothing sensible to do with them anyway.
const MAX_CONTENT_BYTES: u64 = 1024 * 1024;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the given `root` directory
/// recursively and sends `RuntimeEvent::FileChanged` for paths matching the
/// profile.
///
/// - `root` is the project root against which all glob patterns are
///   evaluated; event paths are relativized against it.
/// - `skip_unchanged` enables hash-based suppression of events whose file
///   content did not actually change.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profile: WatchProfile,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    skip_unchanged: bool,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fall back to stderr.
                    eprintln!("watchrun: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("watchrun: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events and forwards change events to
    // the runtime.
    tokio::spawn(async move {
        let mut cache = FileCache::new();

        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            let Some(kind) = change_kind(&event.kind) else {
                continue;
            };

            for path in &event.paths {
                if let Some(change) =
                    build_change(&root, path, kind, &profile, &mut cache, skip_unchanged).await
                {
                    if runtime_tx
                        .send(RuntimeEvent::FileChanged(change))
                        .await
                        .is_err()
                    {
                        // Runtime gone; no point keeping the watcher loop alive.
                        warn!("runtime channel closed; stopping watcher loop");
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Map a notify event kind onto the change kinds the manager understands.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// Turn one changed path into a `FileChangeEvent`, or `None` if it should
/// not be forwarded (filtered out, unreadable, or content unchanged).
async fn build_change(
    root: &Path,
    path: &Path,
    kind: ChangeKind,
    profile: &WatchProfile,
    cache: &mut FileCache,
    skip_unchanged: bool,
) -> Option<FileChangeEvent> {
    let rel = relative_str(root, path)?;

    if !profile.matches(&rel) {
        return None;
    }

    if kind == ChangeKind::Deleted {
        cache.invalidate(&rel);
        return Some(FileChangeEvent::new(rel, kind, None));
    }

    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    if metadata.len() > MAX_CONTENT_BYTES {
        debug!(path = %rel, size = metadata.len(), "file over content cap; forwarding without content");
        return Some(FileChangeEvent::new(rel, kind, None));
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(err) => {
            debug!(path = %rel, error = %err, "failed to read changed file; skipping event");
            return None;
        }
    };

    if skip_unchanged {
        let hash = compute_content_hash(&bytes);
        if !cache.update_if_changed(&rel, hash) {
            debug!(path = %rel, "content unchanged; suppressing event");
            return None;
        }
    }

    let content = String::from_utf8(bytes).ok();
    Some(FileChangeEvent::new(rel, kind, content))
}

/// Relativize `path` against `root` with forward slashes, retrying through
/// canonicalization for symlinked roots (macOS `/private/var` and friends).
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    let rel = path_canon.strip_prefix(&root_canon).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
