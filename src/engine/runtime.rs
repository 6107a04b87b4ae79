// src/engine/runtime.rs

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::hooks::{ExecutionHooks, NoopHooks, ProgressStage, ProgressUpdate};
use crate::engine::queue::ExecutionQueueEntry;
use crate::engine::{CoreCommand, ExecOutcome, ManagerCore, RuntimeEvent};
use crate::errors::Result;
use crate::exec::{ExecutionBackend, ExecutionRequest};

/// Drives the manager core in response to `RuntimeEvent`s, and delegates
/// actual execution to an `ExecutionBackend`.
///
/// This is a pure IO shell around [`ManagerCore`], which contains all the
/// scheduling semantics. This struct handles async IO: reading events from
/// the channel, arming real timers for the core's timer commands, spawning
/// backend executions, and invoking caller hooks.
pub struct Runtime<B: ExecutionBackend> {
    core: ManagerCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    backend: B,
    hooks: Box<dyn ExecutionHooks>,
    execution_timeout_ms: u64,
}

impl<B: ExecutionBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ExecutionBackend> Runtime<B> {
    pub fn new(
        core: ManagerCore,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        backend: B,
        execution_timeout_ms: u64,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            backend,
            hooks: Box::new(NoopHooks),
            execution_timeout_ms,
        }
    }

    /// Replace the no-op hooks with a caller implementation.
    pub fn with_hooks(mut self, hooks: Box<dyn ExecutionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from the channel.
    /// - Answers status queries directly from the core.
    /// - Feeds everything else into the core and executes the commands it
    ///   returns.
    pub async fn run(mut self) -> Result<()> {
        info!("watchrun runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            // Status queries are answered here; they never mutate the core.
            let event = match event {
                RuntimeEvent::QueryStatus(reply) => {
                    let _ = reply.send(self.core.execution_status());
                    continue;
                }
                other => other,
            };

            // Completion events reach the hooks before the core moves on to
            // the next entry.
            if let RuntimeEvent::ExecutionFinished { entry, outcome } = &event {
                self.notify_completion(entry, outcome);
            }

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            // Execute the commands.
            for command in step.commands {
                self.execute_command(command);
            }

            // If the core says to stop, break out of the loop.
            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::ArmDebounceTimer(timer) => {
                self.arm_timer(
                    Duration::from_millis(timer.delay_ms),
                    RuntimeEvent::DebounceFired {
                        path: timer.path,
                        seq: timer.seq,
                    },
                );
            }
            CoreCommand::ArmBatchTimer(timer) => {
                self.arm_timer(
                    Duration::from_millis(timer.delay_ms),
                    RuntimeEvent::BatchWindowElapsed {
                        batch_id: timer.batch_id,
                        seq: timer.seq,
                    },
                );
            }
            CoreCommand::Dispatch { entry, token } => {
                self.dispatch(entry, token);
            }
            CoreCommand::CancelInFlight => {
                if self.backend.supports_cancellation() {
                    self.backend.cancel();
                } else {
                    debug!("backend does not support cancellation; token stays advisory");
                }
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
    }

    /// Arm a real timer that reports back through the event channel.
    ///
    /// The timer task is fire-and-forget: staleness is resolved by the core
    /// via sequence numbers, so a superseded timer firing is harmless.
    fn arm_timer(&self, delay: Duration, event: RuntimeEvent) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event).await;
        });
    }

    /// Start a backend execution for `entry`.
    ///
    /// The execution future runs in its own task so the event loop stays
    /// responsive (to control requests, further changes, cancellation); its
    /// completion comes back as an `ExecutionFinished` event. The core never
    /// issues a second `Dispatch` until that event arrives.
    fn dispatch(&mut self, entry: ExecutionQueueEntry, token: crate::cancel::CancellationToken) {
        if !self.hooks.before_execution(&entry) {
            info!(path = %entry.path, "before-execution hook vetoed run; skipping");
            self.hooks.progress(&ProgressUpdate {
                path: entry.path.clone(),
                stage: ProgressStage::Skipped,
            });

            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                let _ = tx
                    .send(RuntimeEvent::ExecutionFinished {
                        entry,
                        outcome: ExecOutcome::Skipped,
                    })
                    .await;
            });
            return;
        }

        self.hooks.progress(&ProgressUpdate {
            path: entry.path.clone(),
            stage: ProgressStage::Started,
        });

        let path = entry.path.clone();
        token.on_cancelled(move || {
            debug!(path = %path, "cancellation token observed for in-flight execution");
        });

        let request = ExecutionRequest {
            code: entry.content.clone(),
            language: entry.language,
            filename: entry.path.clone(),
            timeout_ms: self.execution_timeout_ms,
        };

        let fut = self.backend.execute(request);
        let tx = self.event_tx.clone();
        let started = Instant::now();

        tokio::spawn(async move {
            let outcome = match fut.await {
                Ok(result) => ExecOutcome::Completed(result),
                Err(err) => ExecOutcome::Infrastructure {
                    error: err.to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                },
            };
            let _ = tx.send(RuntimeEvent::ExecutionFinished { entry, outcome }).await;
        });
    }

    /// Report a resolved execution to the caller hooks.
    fn notify_completion(&mut self, entry: &ExecutionQueueEntry, outcome: &ExecOutcome) {
        match outcome {
            ExecOutcome::Completed(result) => {
                if !result.success {
                    let error = result
                        .error
                        .as_deref()
                        .unwrap_or("execution failed")
                        .to_string();
                    self.hooks.execution_error(entry, &error);
                }
                self.hooks.after_execution(entry, result);
                self.hooks.progress(&ProgressUpdate {
                    path: entry.path.clone(),
                    stage: ProgressStage::Finished {
                        success: result.success,
                    },
                });
            }
            ExecOutcome::Infrastructure { error, .. } => {
                self.hooks.execution_error(entry, error);
                self.hooks.progress(&ProgressUpdate {
                    path: entry.path.clone(),
                    stage: ProgressStage::Finished { success: false },
                });
            }
            ExecOutcome::Skipped => {
                // Progress was already reported when the veto happened.
            }
        }
    }
}
