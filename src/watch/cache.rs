// src/watch/cache.rs

use std::collections::HashMap;

use tracing::debug;

/// In-memory cache of per-file content hashes.
///
/// Lets the watcher decide whether an event actually changed anything
/// without keeping file contents around.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<String, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Store `hash` for `path`, returning true if it differs from the
    /// previously cached value (or no value was cached).
    pub fn update_if_changed(&mut self, path: &str, hash: String) -> bool {
        match self.hashes.get(path) {
            Some(prev) if *prev == hash => false,
            _ => {
                debug!(path, "content hash changed; updating cache");
                self.hashes.insert(path.to_string(), hash);
                true
            }
        }
    }

    /// Forget the cached hash for a file (e.g. on delete).
    pub fn invalidate(&mut self, path: &str) {
        if self.hashes.remove(path).is_some() {
            debug!(path, "invalidated cached hash");
        }
    }
}
