// src/engine/handlers.rs

//! Event handling logic for the core state machine.

use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::engine::core::{InFlight, ManagerCore};
use crate::engine::queue::ExecutionQueueEntry;
use crate::engine::{ControlRequest, ExecOutcome};
use crate::sched::debounce::PendingChange;
use crate::sched::priority::{PriorityFactors, adaptive_delay_ms};
use crate::types::{ChangeKind, ExecutionStrategy, FileChangeEvent, Language};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug)]
pub enum CoreCommand {
    /// Arm a debounce timer; after `delay_ms`, send back a
    /// `DebounceFired { path, seq }` event.
    ArmDebounceTimer(crate::sched::DebounceTimer),
    /// Arm a batch-window timer; after `delay_ms`, send back a
    /// `BatchWindowElapsed { batch_id, seq }` event.
    ArmBatchTimer(crate::sched::BatchTimer),
    /// Hand this entry to the execution backend. At most one dispatch is
    /// outstanding at any time.
    Dispatch {
        entry: ExecutionQueueEntry,
        token: CancellationToken,
    },
    /// Ask the backend to abort the in-flight execution, if it can.
    CancelInFlight,
    /// Request that the process exits (used for `--exec` once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

impl ManagerCore {
    /// Handle a file change from the change source.
    ///
    /// Deleted files drop every piece of pending work for that path: a
    /// delete is never debounced, batched, or executed. Other changes route
    /// by the active strategy.
    pub(crate) fn handle_file_change(&mut self, change: FileChangeEvent) -> CoreStep {
        if !self.enabled {
            debug!(path = %change.path, "auto-execution disabled; ignoring change");
            return CoreStep::running(Vec::new());
        }

        self.metrics.update_change_frequency(&change.path);

        if change.kind == ChangeKind::Deleted {
            let had_pending = self.debounce.cancel(&change.path);
            let was_queued = self.queue.remove_file(&change.path);
            let was_batched = self.batches.remove_file(&change.path);
            debug!(
                path = %change.path,
                had_pending,
                was_queued,
                was_batched,
                "file deleted; dropped pending work"
            );
            return CoreStep::running(Vec::new());
        }

        let mut commands = Vec::new();

        match self.strategy {
            ExecutionStrategy::Debounced => {
                let factors =
                    PriorityFactors::derive(&change.path, &self.metrics, &self.source_extensions);
                let delay_ms = adaptive_delay_ms(self.base_delay_ms, &factors);
                debug!(
                    path = %change.path,
                    importance = factors.file_importance,
                    change_frequency = factors.change_frequency,
                    delay_ms,
                    "debouncing change"
                );

                let timer = self.debounce.schedule(pending_from_change(change), delay_ms);
                commands.push(CoreCommand::ArmDebounceTimer(timer));
            }
            ExecutionStrategy::Batched => {
                let timer = self.batches.schedule(entry_from_change(change));
                commands.push(CoreCommand::ArmBatchTimer(timer));
            }
            ExecutionStrategy::Immediate => {
                self.queue.add(entry_from_change(change));
                self.maybe_dispatch(&mut commands);
            }
        }

        CoreStep::running(commands)
    }

    /// Handle a debounce timer fire. Stale sequences are ignored.
    pub(crate) fn handle_debounce_fired(&mut self, path: &str, seq: u64) -> CoreStep {
        let mut commands = Vec::new();

        if let Some(pending) = self.debounce.take_fired(path, seq) {
            let entry = ExecutionQueueEntry {
                path: pending.path,
                content: pending.content,
                language: pending.language,
                batch_id: None,
            };
            self.queue.add(entry);
            self.maybe_dispatch(&mut commands);
        }

        CoreStep::running(commands)
    }

    /// Handle a batch window fire. Stale sequences are ignored; a current
    /// fire flushes the batch into the queue in dependency order.
    pub(crate) fn handle_batch_elapsed(&mut self, batch_id: &str, seq: u64) -> CoreStep {
        let mut commands = Vec::new();

        if let Some(ordered) = self.batches.take_elapsed(batch_id, seq, &self.metrics) {
            info!(batch_id, members = ordered.len(), "flushing batch");
            for entry in ordered {
                self.queue.add(entry);
            }
            self.maybe_dispatch(&mut commands);
        }

        CoreStep::running(commands)
    }

    /// Handle an explicit run-now request.
    ///
    /// Bypasses debounce and batching entirely and works even while
    /// auto-execution is disabled: it is a direct caller action, not a
    /// reaction to a change event.
    pub(crate) fn handle_manual_execute(&mut self, path: String, content: String) -> CoreStep {
        self.metrics.record_manual_request(&path);

        let language = Language::from_path(&path);
        self.queue.add(ExecutionQueueEntry {
            path,
            content,
            language,
            batch_id: None,
        });

        let mut commands = Vec::new();
        self.maybe_dispatch(&mut commands);
        CoreStep::running(commands)
    }

    /// Handle completion of the in-flight backend call.
    ///
    /// Records the outcome, then immediately dispatches the next queued
    /// entry if there is one; a failure never aborts the queue.
    pub(crate) fn handle_execution_finished(
        &mut self,
        entry: ExecutionQueueEntry,
        outcome: ExecOutcome,
    ) -> CoreStep {
        if self.in_flight.is_none() {
            warn!(
                path = %entry.path,
                "completion event with no in-flight execution; ignoring"
            );
            return CoreStep::running(Vec::new());
        }

        self.in_flight = None;
        self.queue.set_processing(None);

        match &outcome {
            ExecOutcome::Completed(result) if result.success => {
                self.metrics.record_success(&entry.path, result.duration_ms);
            }
            ExecOutcome::Completed(result) => {
                self.metrics.record_failure(&entry.path, result.duration_ms);
            }
            ExecOutcome::Infrastructure { error, duration_ms } => {
                warn!(path = %entry.path, error = %error, "backend infrastructure failure");
                self.metrics.record_failure(&entry.path, *duration_ms);
            }
            ExecOutcome::Skipped => {
                debug!(path = %entry.path, "execution vetoed by hook; nothing recorded");
            }
        }

        let mut commands = Vec::new();
        self.maybe_dispatch(&mut commands);

        let mut keep_running = true;
        if self.options.exit_when_idle && self.is_idle() {
            keep_running = false;
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running,
        }
    }

    /// Handle a caller control request.
    pub(crate) fn handle_control(&mut self, request: ControlRequest) -> CoreStep {
        let mut commands = Vec::new();

        match request {
            ControlRequest::Enable => {
                self.enabled = true;
                info!("auto-execution enabled");
            }
            ControlRequest::Disable => {
                self.enabled = false;
                self.debounce.clear();
                self.batches.clear();
                self.queue.clear();
                info!("auto-execution disabled; cleared timers, batches and queue");
            }
            ControlRequest::Toggle => {
                return self.handle_control(if self.enabled {
                    ControlRequest::Disable
                } else {
                    ControlRequest::Enable
                });
            }
            ControlRequest::CancelExecution => {
                if let Some(in_flight) = &self.in_flight {
                    info!(path = %in_flight.path, "cancellation requested for in-flight execution");
                    in_flight.token.cancel();
                    commands.push(CoreCommand::CancelInFlight);
                } else {
                    debug!("cancellation requested but nothing is executing");
                }
            }
            ControlRequest::SetStrategy(strategy) => {
                if strategy != self.strategy {
                    info!(?strategy, "switching scheduling strategy");
                    // Buffered batches still represent observed work: flush
                    // them into the queue. Pending debounce state is dropped;
                    // the next change re-schedules under the new strategy.
                    for batch in self.batches.flush_all(&self.metrics) {
                        for entry in batch {
                            self.queue.add(entry);
                        }
                    }
                    self.debounce.clear();
                    self.strategy = strategy;
                    self.maybe_dispatch(&mut commands);
                }
            }
            ControlRequest::SetDebounceDelay(ms) => {
                self.base_delay_ms = ms.max(1);
                debug!(base_delay_ms = self.base_delay_ms, "base debounce delay updated");
            }
            ControlRequest::SetFileDependency { path, dependency } => {
                self.metrics.set_file_dependency(&path, dependency);
            }
        }

        CoreStep::running(commands)
    }

    /// Dispatch the next queued entry unless one is already in flight.
    ///
    /// This is the single-flight invariant: a `Dispatch` command is only
    /// ever emitted from here, and only when the in-flight slot is empty.
    fn maybe_dispatch(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.in_flight.is_some() {
            return;
        }

        let Some((entry, wait)) = self.queue.next() else {
            return;
        };

        self.metrics.record_queue_wait(wait);

        let token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            path: entry.path.clone(),
            token: token.clone(),
        });
        self.queue.set_processing(Some(entry.path.clone()));

        debug!(path = %entry.path, "dispatching entry to execution backend");
        commands.push(CoreCommand::Dispatch { entry, token });
    }
}

fn pending_from_change(change: FileChangeEvent) -> PendingChange {
    let language = Language::from_path(&change.path);
    PendingChange {
        path: change.path,
        content: change.content.unwrap_or_default(),
        language,
    }
}

fn entry_from_change(change: FileChangeEvent) -> ExecutionQueueEntry {
    let language = Language::from_path(&change.path);
    ExecutionQueueEntry {
        path: change.path,
        content: change.content.unwrap_or_default(),
        language,
        batch_id: None,
    }
}
