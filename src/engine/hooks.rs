// src/engine/hooks.rs

//! Caller lifecycle hooks around executions.

use crate::engine::queue::ExecutionQueueEntry;
use crate::exec::ExecutionResult;

/// Where in its lifecycle an execution currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// The entry was handed to the backend.
    Started,
    /// The backend call resolved.
    Finished { success: bool },
    /// A before-execution hook vetoed the run.
    Skipped,
}

/// Progress notification delivered to [`ExecutionHooks::progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub path: String,
    pub stage: ProgressStage,
}

/// Lifecycle hooks invoked by the runtime shell around each execution.
///
/// All methods default to no-ops; implement only what you need. Returning
/// `false` from `before_execution` skips the entry entirely: it is neither
/// executed nor recorded, and the next queued entry dispatches normally.
pub trait ExecutionHooks: Send {
    fn before_execution(&mut self, _entry: &ExecutionQueueEntry) -> bool {
        true
    }

    fn after_execution(&mut self, _entry: &ExecutionQueueEntry, _result: &ExecutionResult) {}

    fn execution_error(&mut self, _entry: &ExecutionQueueEntry, _error: &str) {}

    fn progress(&mut self, _update: &ProgressUpdate) {}
}

/// Hooks implementation that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExecutionHooks for NoopHooks {}
