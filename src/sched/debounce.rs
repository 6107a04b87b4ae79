// src/sched/debounce.rs

//! Per-file debounce state.
//!
//! Each file has at most one pending change at a time. Every scheduling call
//! stores the latest change under a fresh arm sequence and hands back the
//! timer the shell must arm; a fire notification carrying anything but the
//! current sequence is stale and ignored. That staleness check *is* the
//! debounce: only the most recent scheduling call for a file ever takes
//! effect, earlier timers are effectively cancelled.

use std::collections::HashMap;

use tracing::debug;

use crate::types::Language;

/// The buffered latest change for one file.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub path: String,
    pub content: String,
    pub language: Language,
}

/// A timer the shell must arm: after `delay_ms`, report
/// `(path, seq)` back as a debounce fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceTimer {
    pub path: String,
    pub seq: u64,
    pub delay_ms: u64,
}

#[derive(Debug)]
struct Armed {
    seq: u64,
    pending: PendingChange,
}

/// Tracks the pending change and current arm sequence per file.
#[derive(Debug, Default)]
pub struct DebounceScheduler {
    seq_counter: u64,
    armed: HashMap<String, Armed>,
}

impl DebounceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `change` as the latest pending change for its file and return
    /// the timer to arm.
    ///
    /// Re-scheduling before the previous timer fires replaces the pending
    /// content and invalidates the previous sequence (last call wins).
    pub fn schedule(&mut self, change: PendingChange, delay_ms: u64) -> DebounceTimer {
        self.seq_counter += 1;
        let seq = self.seq_counter;
        let path = change.path.clone();

        if let Some(prev) = self.armed.insert(path.clone(), Armed { seq, pending: change }) {
            debug!(
                path = %path,
                superseded_seq = prev.seq,
                seq,
                "re-armed debounce timer; previous pending change superseded"
            );
        }

        DebounceTimer {
            path,
            seq,
            delay_ms,
        }
    }

    /// Resolve a timer fire.
    ///
    /// Returns the pending change if `seq` is still current for `path`;
    /// `None` for stale fires (a newer schedule or a cancel got there first).
    pub fn take_fired(&mut self, path: &str, seq: u64) -> Option<PendingChange> {
        match self.armed.get(path).map(|a| a.seq) {
            Some(current) if current == seq => self.armed.remove(path).map(|a| a.pending),
            Some(current) => {
                debug!(
                    path,
                    fired_seq = seq,
                    current_seq = current,
                    "ignoring stale debounce fire"
                );
                None
            }
            None => None,
        }
    }

    /// Drop any pending change for `path`. Returns whether one existed.
    pub fn cancel(&mut self, path: &str) -> bool {
        self.armed.remove(path).is_some()
    }

    /// Drop all pending changes.
    pub fn clear(&mut self) {
        self.armed.clear();
    }

    /// Number of files with a pending change.
    pub fn pending_count(&self) -> usize {
        self.armed.len()
    }
}
