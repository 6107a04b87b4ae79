// src/engine/mod.rs

//! Orchestration engine for watchrun.
//!
//! This module ties together:
//! - the bounded execution queue
//! - the adaptive debounce scheduler and the batch processor
//! - the metrics collector feeding both
//! - the main runtime event loop that reacts to:
//!   - file change events
//!   - debounce and batch-window timer fires
//!   - execution completion events
//!   - caller control requests and shutdown signals
//!
//! The pure core state machine lives in [`core`] (with its event handlers in
//! [`handlers`]); the async/IO shell is implemented in [`runtime`].

use tokio::sync::oneshot;

use crate::exec::ExecutionResult;
use crate::metrics::FileDependency;
use crate::types::{ExecutionStrategy, FileChangeEvent};

pub mod core;
pub mod handle;
pub mod handlers;
pub mod hooks;
pub mod queue;
pub mod runtime;

pub use self::core::ManagerCore;
pub use handle::ManagerHandle;
pub use handlers::{CoreCommand, CoreStep};
pub use hooks::{ExecutionHooks, NoopHooks, ProgressStage, ProgressUpdate};
pub use queue::{ExecutionQueue, ExecutionQueueEntry, QueueStatus};
pub use runtime::Runtime;

/// How an execution attempt ended, from the manager's point of view.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// The backend ran the entry and produced a result (which may itself
    /// report `success: false`, e.g. a non-zero exit or a backend timeout).
    Completed(ExecutionResult),
    /// The backend call failed outright (spawn error, channel breakage).
    Infrastructure { error: String, duration_ms: u64 },
    /// A before-execution hook vetoed the run; nothing executed and no
    /// metrics are recorded.
    Skipped,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is queued, pending, or in
    /// flight (used for one-shot `--exec` mode).
    pub exit_when_idle: bool,
}

/// Caller-facing status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub is_running: bool,
    pub queued_paths: Vec<String>,
    pub execution_count: u64,
}

/// Caller control requests, delivered through the runtime channel.
#[derive(Debug)]
pub enum ControlRequest {
    Enable,
    Disable,
    Toggle,
    CancelExecution,
    SetStrategy(ExecutionStrategy),
    SetDebounceDelay(u64),
    SetFileDependency {
        path: String,
        dependency: FileDependency,
    },
}

/// Events flowing into the runtime from the watcher, timers, executions and
/// callers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// The change source observed a file change.
    FileChanged(FileChangeEvent),
    /// A per-file debounce timer elapsed.
    DebounceFired { path: String, seq: u64 },
    /// A batch window timer elapsed.
    BatchWindowElapsed { batch_id: String, seq: u64 },
    /// A caller asked for an immediate run, bypassing debounce and batching.
    ManualExecute { path: String, content: String },
    /// The in-flight backend call resolved.
    ExecutionFinished {
        entry: ExecutionQueueEntry,
        outcome: ExecOutcome,
    },
    /// A caller control request.
    Control(ControlRequest),
    /// Status query, answered by the shell without entering the core.
    QueryStatus(oneshot::Sender<ExecutionStatus>),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}
