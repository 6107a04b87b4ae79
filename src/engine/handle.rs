// src/engine/handle.rs

//! Caller-facing control surface.
//!
//! A [`ManagerHandle`] is a cheap clone around the runtime event channel.
//! Everything the UI or an embedding application needs (enabling, strategy
//! switches, run-now, cancellation, status) goes through here as events;
//! nothing touches scheduler state directly.

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};

use crate::engine::{ControlRequest, ExecutionStatus, RuntimeEvent};
use crate::errors::{Result, WatchrunError};
use crate::metrics::FileDependency;
use crate::types::{ExecutionStrategy, FileChangeEvent};

#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl ManagerHandle {
    pub fn new(tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { tx }
    }

    async fn send(&self, event: RuntimeEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| WatchrunError::ChannelClosed("runtime event channel".to_string()))
    }

    /// Deliver a file change event from an external change source.
    pub async fn handle_file_change(&self, event: FileChangeEvent) -> Result<()> {
        self.send(RuntimeEvent::FileChanged(event)).await
    }

    pub async fn enable(&self) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::Enable)).await
    }

    pub async fn disable(&self) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::Disable)).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::Toggle)).await
    }

    /// Run `path` immediately, bypassing debounce and batching.
    ///
    /// When `content` is `None` the file is read from disk first.
    pub async fn execute_now(
        &self,
        path: impl Into<String>,
        content: Option<String>,
    ) -> Result<()> {
        let path = path.into();
        let content = match content {
            Some(c) => c,
            None => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading '{path}' for execute_now"))?,
        };

        self.send(RuntimeEvent::ManualExecute { path, content }).await
    }

    /// Signal cancellation of the in-flight execution, if any.
    ///
    /// Cooperative: the backend is asked to stop, but the execution's
    /// completion event still resolves it normally.
    pub async fn cancel_execution(&self) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::CancelExecution))
            .await
    }

    pub async fn set_strategy(&self, strategy: ExecutionStrategy) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::SetStrategy(strategy)))
            .await
    }

    pub async fn set_debounce_delay(&self, delay_ms: u64) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::SetDebounceDelay(
            delay_ms,
        )))
        .await
    }

    /// Store externally computed dependency info for a file.
    pub async fn set_file_dependency(
        &self,
        path: impl Into<String>,
        dependency: FileDependency,
    ) -> Result<()> {
        self.send(RuntimeEvent::Control(ControlRequest::SetFileDependency {
            path: path.into(),
            dependency,
        }))
        .await
    }

    /// Current status snapshot, answered by the runtime loop.
    pub async fn execution_status(&self) -> Result<ExecutionStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RuntimeEvent::QueryStatus(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| WatchrunError::ChannelClosed("status reply channel".to_string()))
    }

    /// Request a graceful runtime shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(RuntimeEvent::ShutdownRequested).await
    }
}
