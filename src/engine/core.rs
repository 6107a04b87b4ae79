// src/engine/core.rs

//! Pure core state machine of the auto-execution manager.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - arming real timers for the debounce/batch commands
//! - calling the execution backend and the caller hooks
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes. Timers exist here only as sequence
//! numbers: arming is a command, and a fire notification with a stale
//! sequence is ignored, which is what makes re-arming a cancellation.

use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::config::ConfigFile;
use crate::engine::queue::ExecutionQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::engine::handlers::CoreStep;
use crate::metrics::MetricsCollector;
use crate::sched::{BatchProcessor, DebounceScheduler};
use crate::time::Clock;
use crate::types::ExecutionStrategy;

/// The currently executing entry, as far as the core knows.
#[derive(Debug)]
pub(crate) struct InFlight {
    pub path: String,
    pub token: CancellationToken,
}

/// Pure core state of the auto-execution manager.
///
/// This owns:
/// - the execution queue and the in-flight slot (single-flight invariant)
/// - the debounce scheduler and batch processor
/// - the metrics collector feeding the scheduling heuristics
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct ManagerCore {
    pub(crate) enabled: bool,
    pub(crate) strategy: ExecutionStrategy,
    pub(crate) base_delay_ms: u64,
    pub(crate) source_extensions: Vec<String>,
    pub(crate) queue: ExecutionQueue,
    pub(crate) debounce: DebounceScheduler,
    pub(crate) batches: BatchProcessor,
    pub(crate) metrics: MetricsCollector,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) options: RuntimeOptions,
}

impl ManagerCore {
    pub fn new(cfg: &ConfigFile, clock: Arc<dyn Clock>, options: RuntimeOptions) -> Self {
        Self {
            enabled: true,
            strategy: cfg.config().strategy,
            base_delay_ms: cfg.config().debounce_ms,
            source_extensions: cfg.watch().source_extensions.clone(),
            queue: ExecutionQueue::new(cfg.config().max_queue_size, Arc::clone(&clock)),
            debounce: DebounceScheduler::new(),
            batches: BatchProcessor::new(
                cfg.batch().window_ms,
                cfg.batch().dependency_resolution,
            ),
            metrics: MetricsCollector::new(clock),
            in_flight: None,
            options,
        }
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    ///
    /// `QueryStatus` never reaches this method; the shell answers it from
    /// [`Self::execution_status`] directly.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::FileChanged(change) => self.handle_file_change(change),
            RuntimeEvent::DebounceFired { path, seq } => self.handle_debounce_fired(&path, seq),
            RuntimeEvent::BatchWindowElapsed { batch_id, seq } => {
                self.handle_batch_elapsed(&batch_id, seq)
            }
            RuntimeEvent::ManualExecute { path, content } => {
                self.handle_manual_execute(path, content)
            }
            RuntimeEvent::ExecutionFinished { entry, outcome } => {
                self.handle_execution_finished(entry, outcome)
            }
            RuntimeEvent::Control(request) => self.handle_control(request),
            RuntimeEvent::QueryStatus(_) => CoreStep::running(Vec::new()),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// Whether automatic execution is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The active scheduling strategy.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Whether an execution is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Nothing queued, pending, or in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
            && self.queue.is_empty()
            && self.debounce.pending_count() == 0
            && self.batches.batch_count() == 0
    }

    /// Caller-facing status snapshot.
    pub fn execution_status(&self) -> crate::engine::ExecutionStatus {
        crate::engine::ExecutionStatus {
            is_running: self.in_flight.is_some(),
            queued_paths: self.queue.status().queued_paths,
            execution_count: self.metrics.total_executions(),
        }
    }

    /// Queue status, including the manager-set processing flags.
    pub fn queue_status(&self) -> crate::engine::QueueStatus {
        self.queue.status()
    }

    /// Read access to the collected metrics.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Mutable access to the collected metrics (dependency seeding, resets).
    pub fn metrics_mut(&mut self) -> &mut MetricsCollector {
        &mut self.metrics
    }
}
