// src/sched/batch.rs

//! Directory-scoped batching of queued entries.
//!
//! Files changed close together in the tree usually belong together: members
//! of the same batch accumulate during a window and flush as one ordered
//! unit. Ordering applies a dependency-aware pass restricted to the batch's
//! own members; cycles degrade to insertion order rather than erroring.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::engine::queue::ExecutionQueueEntry;
use crate::metrics::MetricsCollector;

/// Batch id for files with no parent directory.
pub const ROOT_BATCH_ID: &str = "batch_root";

/// Directory names treated as source roots when deriving batch ids.
const SOURCE_ROOT_MARKERS: [&str; 3] = ["src", "lib", "components"];

/// A timer the shell must arm: after `delay_ms`, report
/// `(batch_id, seq)` back as a window-elapsed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTimer {
    pub batch_id: String,
    pub seq: u64,
    pub delay_ms: u64,
}

#[derive(Debug)]
struct Batch {
    seq: u64,
    entries: Vec<ExecutionQueueEntry>,
}

impl Batch {
    /// Insert latest-wins by path: a replacement keeps the original
    /// insertion position, new paths append.
    fn upsert(&mut self, entry: ExecutionQueueEntry) {
        match self.entries.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

/// Buffers entries into batches and flushes them dependency-ordered.
#[derive(Debug)]
pub struct BatchProcessor {
    window_ms: u64,
    dependency_resolution: bool,
    seq_counter: u64,
    batches: HashMap<String, Batch>,
}

impl BatchProcessor {
    pub fn new(window_ms: u64, dependency_resolution: bool) -> Self {
        Self {
            window_ms,
            dependency_resolution,
            seq_counter: 0,
            batches: HashMap::new(),
        }
    }

    /// Add `entry` to its directory batch and return the re-armed window
    /// timer.
    ///
    /// Every addition refreshes the batch's sequence, so only the timer armed
    /// for the *last* member added ever flushes the batch.
    pub fn schedule(&mut self, mut entry: ExecutionQueueEntry) -> BatchTimer {
        let batch_id = batch_id_for(&entry.path);
        entry.batch_id = Some(batch_id.clone());

        self.seq_counter += 1;
        let seq = self.seq_counter;

        let batch = self.batches.entry(batch_id.clone()).or_insert(Batch {
            seq,
            entries: Vec::new(),
        });
        batch.seq = seq;
        batch.upsert(entry);

        debug!(
            batch_id = %batch_id,
            seq,
            members = batch.entries.len(),
            "batch window re-armed"
        );

        BatchTimer {
            batch_id,
            seq,
            delay_ms: self.window_ms,
        }
    }

    /// Resolve a window-elapsed notification.
    ///
    /// Returns the ordered members if `seq` is still current for the batch;
    /// `None` for stale fires.
    pub fn take_elapsed(
        &mut self,
        batch_id: &str,
        seq: u64,
        metrics: &MetricsCollector,
    ) -> Option<Vec<ExecutionQueueEntry>> {
        match self.batches.get(batch_id).map(|b| b.seq) {
            Some(current) if current == seq => self
                .batches
                .remove(batch_id)
                .map(|batch| self.order_entries(batch.entries, metrics)),
            Some(current) => {
                debug!(
                    batch_id,
                    fired_seq = seq,
                    current_seq = current,
                    "ignoring stale batch window fire"
                );
                None
            }
            None => None,
        }
    }

    /// Flush every batch synchronously, invalidating all window timers.
    ///
    /// Batch order is unspecified; order within each batch follows the usual
    /// dependency pass.
    pub fn flush_all(&mut self, metrics: &MetricsCollector) -> Vec<Vec<ExecutionQueueEntry>> {
        let batches = std::mem::take(&mut self.batches);
        batches
            .into_values()
            .map(|b| self.order_entries(b.entries, metrics))
            .collect()
    }

    /// Remove `path` from whichever batch holds it; empty batches are
    /// dropped. Returns whether anything was removed.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let mut removed = false;
        self.batches.retain(|_, batch| {
            let before = batch.entries.len();
            batch.entries.retain(|e| e.path != path);
            removed |= batch.entries.len() != before;
            !batch.entries.is_empty()
        });
        removed
    }

    /// Drop all batches and their pending timers.
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    /// Number of batches currently buffering.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Apply the dependency-aware ordering pass, if enabled.
    ///
    /// Repeatedly take the first not-yet-placed entry whose dependencies
    /// (restricted to members of this batch) have all been placed. When no
    /// entry qualifies (a cycle, or dependency info pointing at itself),
    /// append the remainder in original order.
    fn order_entries(
        &self,
        entries: Vec<ExecutionQueueEntry>,
        metrics: &MetricsCollector,
    ) -> Vec<ExecutionQueueEntry> {
        if !self.dependency_resolution || entries.len() <= 1 {
            return entries;
        }

        let member_paths: HashSet<String> = entries.iter().map(|e| e.path.clone()).collect();
        let in_batch_deps: HashMap<String, Vec<String>> = entries
            .iter()
            .map(|e| {
                let deps = metrics
                    .file_dependency(&e.path)
                    .map(|d| {
                        d.dependencies
                            .iter()
                            .filter(|dep| **dep != e.path && member_paths.contains(*dep))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                (e.path.clone(), deps)
            })
            .collect();

        let mut remaining: Vec<ExecutionQueueEntry> = entries;
        let mut ordered: Vec<ExecutionQueueEntry> = Vec::with_capacity(remaining.len());
        let mut placed: HashSet<String> = HashSet::new();

        while !remaining.is_empty() {
            let next_idx = remaining.iter().position(|e| {
                in_batch_deps
                    .get(&e.path)
                    .is_none_or(|deps| deps.iter().all(|d| placed.contains(d)))
            });

            match next_idx {
                Some(idx) => {
                    let entry = remaining.remove(idx);
                    placed.insert(entry.path.clone());
                    ordered.push(entry);
                }
                None => {
                    warn!(
                        unresolved = remaining.len(),
                        "dependency cycle among batch members; flushing remainder in original order"
                    );
                    ordered.append(&mut remaining);
                }
            }
        }

        ordered
    }
}

/// Derive the batch id for a path.
///
/// - No directory part -> the shared root batch.
/// - A directory chain containing a source-root marker -> the last two
///   directory segments, joined and sanitized.
/// - Anything else -> the full directory part, sanitized.
pub fn batch_id_for(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() <= 1 {
        return ROOT_BATCH_ID.to_string();
    }

    let dirs = &segments[..segments.len() - 1];
    let has_source_root = dirs.iter().any(|d| SOURCE_ROOT_MARKERS.contains(d));

    let id_segments: &[&str] = if has_source_root && dirs.len() > 2 {
        &dirs[dirs.len() - 2..]
    } else {
        dirs
    };

    sanitize(&id_segments.join("_"))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
