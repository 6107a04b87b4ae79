// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The runtime talks to an `ExecutionBackend` instead of spawning processes
//! directly. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation in [`process`](super::process).
//!
//! Cancellation support is an explicit capability: the runtime only calls
//! `cancel` on backends that report `supports_cancellation() == true`, and
//! cancellation remains best-effort either way: the call in flight resolves
//! normally through its completion event.

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use crate::errors::Result;
use crate::types::Language;

/// One execution request, handed to the backend by the runtime shell.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// The code to run (the changed file's content).
    pub code: String,
    pub language: Language,
    /// Original path, for diagnostics and error messages.
    pub filename: String,
    /// Hard wall-clock limit for the run.
    pub timeout_ms: u64,
}

/// Outcome of a single backend run.
///
/// A timeout or a non-zero exit is a *result* (`success: false` with an
/// error description), not an `Err`; `Err` is reserved for infrastructure
/// failures such as a spawn error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub timestamp: SystemTime,
}

/// Trait abstracting how queued entries are executed.
///
/// Production code uses [`ProcessBackend`](super::ProcessBackend); tests can
/// provide their own implementation that doesn't spawn real processes.
///
/// The returned future is `'static` so the runtime can drive it in a spawned
/// task while its event loop keeps processing control requests. The runtime
/// guarantees at most one execution future is live at a time.
pub trait ExecutionBackend: Send {
    fn execute(
        &mut self,
        request: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'static>>;

    /// Whether `cancel` can actually interrupt an in-flight execution.
    fn supports_cancellation(&self) -> bool {
        false
    }

    /// Best-effort cancellation of the in-flight execution.
    fn cancel(&mut self) {}
}
