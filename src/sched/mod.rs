// src/sched/mod.rs

//! Adaptive scheduling: priority heuristics, per-file debouncing, and
//! directory-scoped batching.

pub mod batch;
pub mod debounce;
pub mod priority;

pub use batch::{BatchProcessor, BatchTimer, batch_id_for};
pub use debounce::{DebounceScheduler, DebounceTimer, PendingChange};
pub use priority::{PriorityFactors, adaptive_delay_ms, file_importance};
