// src/watch/hash.rs

//! Content hashing for change suppression.

use blake3::Hasher;

/// Hash a file's content as observed by the watcher.
///
/// Used together with [`FileCache`](super::FileCache) to drop events whose
/// content did not actually change (editors love rewriting identical bytes).
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}
