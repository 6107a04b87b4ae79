// src/engine/queue.rs

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::time::Clock;
use crate::types::Language;

/// A pending execution request for one file.
///
/// Created when a debounce timer fires or a batch flushes; destroyed once
/// dequeued and executed. No history is retained here beyond what the
/// metrics collector aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionQueueEntry {
    pub path: String,
    pub content: String,
    pub language: Language,
    /// Set only on entries produced by the batch path.
    pub batch_id: Option<String>,
}

impl ExecutionQueueEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
            batch_id: None,
        }
    }
}

/// Status snapshot exposed for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub size: usize,
    pub is_processing: bool,
    pub current_path: Option<String>,
    pub queued_paths: Vec<String>,
}

#[derive(Debug)]
struct Queued {
    entry: ExecutionQueueEntry,
    enqueued_at: Instant,
}

/// Bounded, deduplicated FIFO of pending execution requests.
///
/// Semantics:
/// - At most one live entry per path: adding a path that is already queued
///   evicts the old entry first, and the fresh one appends at the back
///   (dedup-by-latest).
/// - The capacity bound is the backpressure mechanism: once full, the oldest
///   entry is displaced by new arrivals. This is a silent, logged drop, not
///   an error; callers get no synchronous overflow signal.
/// - The queue performs no execution; `is_processing`/`current_path` are
///   manager-set flags surfaced through [`QueueStatus`].
pub struct ExecutionQueue {
    clock: Arc<dyn Clock>,
    capacity: usize,
    entries: VecDeque<Queued>,
    processing: Option<String>,
}

impl std::fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.entries.len())
            .field("processing", &self.processing)
            .finish_non_exhaustive()
    }
}

impl ExecutionQueue {
    /// Create a queue with the given capacity.
    ///
    /// `capacity` is clamped to at least 1, as a zero-length queue would make
    /// queuing semantics meaningless.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            clock,
            capacity,
            entries: VecDeque::with_capacity(capacity),
            processing: None,
        }
    }

    /// Append `entry`, deduplicating by path and evicting the oldest entry
    /// if the queue is full. Returns whether the entry was accepted (always,
    /// after eviction).
    pub fn add(&mut self, entry: ExecutionQueueEntry) -> bool {
        if let Some(pos) = self.entries.iter().position(|q| q.entry.path == entry.path) {
            self.entries.remove(pos);
            debug!(path = %entry.path, "replaced queued entry with newer change");
        }

        if self.entries.len() >= self.capacity {
            if let Some(dropped) = self.entries.pop_front() {
                warn!(
                    dropped = %dropped.entry.path,
                    capacity = self.capacity,
                    "queue full; displacing oldest entry"
                );
            }
        }

        self.entries.push_back(Queued {
            entry,
            enqueued_at: self.clock.now(),
        });
        true
    }

    /// Pop the front entry together with how long it waited.
    pub fn next(&mut self) -> Option<(ExecutionQueueEntry, Duration)> {
        let queued = self.entries.pop_front()?;
        let wait = self.clock.now().saturating_duration_since(queued.enqueued_at);
        Some((queued.entry, wait))
    }

    /// Remove any queued entry for `path`. Returns whether one existed.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|q| q.entry.path != path);
        self.entries.len() != before
    }

    /// Drop all queued entries. The processing flag is left untouched.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Manager hook: record which path is currently executing, if any.
    pub fn set_processing(&mut self, path: Option<String>) {
        self.processing = path;
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            size: self.entries.len(),
            is_processing: self.processing.is_some(),
            current_path: self.processing.clone(),
            queued_paths: self.entries.iter().map(|q| q.entry.path.clone()).collect(),
        }
    }
}
