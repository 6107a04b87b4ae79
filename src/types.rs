use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;

/// How change events are turned into executions.
///
/// - `Debounced`: each file gets its own adaptive quiet-period timer; only
///   the latest change within the window survives (default behaviour).
/// - `Batched`: changes accumulate into directory-scoped batches that flush
///   together, dependency-ordered, after a fixed window.
/// - `Immediate`: every surviving change event is enqueued straight away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Debounced,
    Batched,
    Immediate,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Debounced
    }
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debounced" => Ok(ExecutionStrategy::Debounced),
            "batched" => Ok(ExecutionStrategy::Batched),
            "immediate" => Ok(ExecutionStrategy::Immediate),
            other => Err(format!(
                "invalid strategy: {other} (expected \"debounced\", \"batched\" or \"immediate\")"
            )),
        }
    }
}

/// What kind of filesystem change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A single file change as delivered by the change source.
///
/// Transient: consumed exactly once by the manager, never persisted.
/// `content` is absent for deletes and for files the watcher chose not to
/// read (e.g. over the size cap).
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
    pub content: Option<String>,
    pub timestamp: SystemTime,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind, content: Option<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            content,
            timestamp: SystemTime::now(),
        }
    }
}

/// Source language of a file, as far as the execution backend cares.
///
/// Detection is purely extension-based; anything unrecognized is `Unknown`
/// and the backend decides what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Shell,
    Unknown,
}

impl Language {
    /// Detect a language from the file extension of `path`.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, e)| e.to_lowercase());
        match ext.as_deref() {
            Some("js" | "mjs" | "cjs" | "jsx") => Language::JavaScript,
            Some("ts" | "tsx") => Language::TypeScript,
            Some("py") => Language::Python,
            Some("sh" | "bash") => Language::Shell,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Shell => "shell",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
