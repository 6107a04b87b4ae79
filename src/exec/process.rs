// src/exec/process.rs

//! Process-based execution backend.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::backend::{ExecutionBackend, ExecutionRequest, ExecutionResult};
use crate::types::Language;

/// Runs each request through an interpreter chosen by language.
///
/// - The child is spawned with piped stdout/stderr and `kill_on_drop`, so an
///   abandoned execution can't outlive the runtime.
/// - `timeout_ms` is enforced here: an overrun kills the child and yields
///   `success: false` with a timeout description rather than an error.
/// - Cancellation is supported by killing the child of the current request.
pub struct ProcessBackend {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl std::fmt::Debug for ProcessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessBackend").finish_non_exhaustive()
    }
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessBackend {
    pub fn new() -> Self {
        Self { cancel_tx: None }
    }
}

impl ExecutionBackend for ProcessBackend {
    fn execute(
        &mut self,
        request: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'static>> {
        // Single-flight is guaranteed upstream, so replacing the previous
        // sender only ever drops a channel whose run already resolved.
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel_tx = Some(cancel_tx);

        Box::pin(run_request(request, cancel_rx))
    }

    fn supports_cancellation(&self) -> bool {
        true
    }

    fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            if tx.send(()).is_err() {
                debug!("execution already finished while cancelling");
            }
        }
    }
}

async fn run_request(
    request: ExecutionRequest,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<ExecutionResult> {
    let started = Instant::now();

    let Some(mut cmd) = interpreter_command(&request) else {
        return Ok(failure_result(
            started,
            format!(
                "no interpreter configured for language '{}' ({})",
                request.language, request.filename
            ),
        ));
    };

    info!(
        file = %request.filename,
        language = %request.language,
        timeout_ms = request.timeout_ms,
        "starting execution process"
    );

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning interpreter for '{}'", request.filename))?;

    // Drain both pipes in the background so buffers never fill.
    let stdout_task = tokio::spawn(drain(child.stdout.take()));
    let stderr_task = tokio::spawn(drain(child.stderr.take()));

    // Either the process exits on its own, the timeout elapses, or a
    // cancellation request arrives.
    enum Ending {
        Exited(std::process::ExitStatus),
        TimedOut,
        Cancelled,
    }

    let ending = tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for interpreter of '{}'", request.filename))?;
            Ending::Exited(status)
        }
        _ = tokio::time::sleep(Duration::from_millis(request.timeout_ms)) => {
            warn!(file = %request.filename, "execution timed out; killing process");
            kill_child(&mut child, &request.filename).await;
            Ending::TimedOut
        }
        _ = &mut cancel_rx => {
            info!(file = %request.filename, "execution cancelled; killing process");
            kill_child(&mut child, &request.filename).await;
            Ending::Cancelled
        }
    };

    let output = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let duration_ms = started.elapsed().as_millis() as u64;

    let result = match ending {
        Ending::Exited(status) => {
            let success = status.success();
            let error = if success {
                None
            } else {
                let code = status.code().unwrap_or(-1);
                Some(if stderr.is_empty() {
                    format!("process exited with code {code}")
                } else {
                    stderr
                })
            };
            info!(
                file = %request.filename,
                success,
                duration_ms,
                "execution process exited"
            );
            ExecutionResult {
                success,
                output,
                error,
                duration_ms,
                timestamp: SystemTime::now(),
            }
        }
        Ending::TimedOut => ExecutionResult {
            success: false,
            output,
            error: Some(format!(
                "execution timed out after {}ms",
                request.timeout_ms
            )),
            duration_ms,
            timestamp: SystemTime::now(),
        },
        Ending::Cancelled => ExecutionResult {
            success: false,
            output,
            error: Some("execution cancelled".to_string()),
            duration_ms,
            timestamp: SystemTime::now(),
        },
    };

    Ok(result)
}

async fn kill_child(child: &mut tokio::process::Child, filename: &str) {
    if let Err(e) = child.kill().await {
        warn!(file = %filename, error = %e, "failed to kill execution process");
    }
}

async fn drain(pipe: Option<impl AsyncRead + Unpin>) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };
    let mut buf = String::new();
    let mut reader = BufReader::new(pipe);
    if let Err(e) = reader.read_to_string(&mut buf).await {
        debug!(error = %e, "failed to read process output");
    }
    buf
}

/// Map a request onto an interpreter invocation, or `None` for languages
/// this backend cannot run.
fn interpreter_command(request: &ExecutionRequest) -> Option<Command> {
    let mut cmd = match request.language {
        Language::JavaScript => {
            let mut c = Command::new("node");
            c.arg("-e").arg(&request.code);
            c
        }
        Language::Python => {
            let mut c = if cfg!(windows) {
                Command::new("python")
            } else {
                Command::new("python3")
            };
            c.arg("-c").arg(&request.code);
            c
        }
        Language::Shell => {
            if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&request.code);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&request.code);
                c
            }
        }
        Language::TypeScript | Language::Unknown => return None,
    };

    cmd.stdin(Stdio::null());
    Some(cmd)
}

fn failure_result(started: Instant, error: String) -> ExecutionResult {
    ExecutionResult {
        success: false,
        output: String::new(),
        error: Some(error),
        duration_ms: started.elapsed().as_millis() as u64,
        timestamp: SystemTime::now(),
    }
}
