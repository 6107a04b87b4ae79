// src/config/model.rs

use serde::Deserialize;

use crate::types::ExecutionStrategy;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// strategy = "debounced"
/// debounce_ms = 300
/// max_queue_size = 50
///
/// [batch]
/// window_ms = 1000
/// dependency_resolution = true
///
/// [watch]
/// include = ["src/**/*.ts"]
/// exclude = ["**/node_modules/**"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Scheduling behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Batch-mode behaviour from `[batch]`.
    #[serde(default)]
    pub batch: BatchSection,

    /// Watcher behaviour from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"debounced"`, `"batched"` or `"immediate"`.
    #[serde(default)]
    pub strategy: ExecutionStrategy,

    /// Base debounce delay in milliseconds, before adaptive scaling.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of pending execution entries. Once full, the oldest
    /// entry is displaced by new arrivals.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Hard timeout handed to the execution backend, per run.
    #[serde(default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_queue_size() -> usize {
    50
}

fn default_execution_timeout_ms() -> u64 {
    30_000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::default(),
            debounce_ms: default_debounce_ms(),
            max_queue_size: default_max_queue_size(),
            execution_timeout_ms: default_execution_timeout_ms(),
        }
    }
}

/// `[batch]` section. Only consulted when the strategy is `"batched"`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    /// Window during which a batch keeps accumulating members, re-armed on
    /// every addition.
    #[serde(default = "default_batch_window_ms")]
    pub window_ms: u64,

    /// Whether to order flushed batches by the stored file dependencies.
    #[serde(default = "default_dependency_resolution")]
    pub dependency_resolution: bool,
}

fn default_batch_window_ms() -> u64 {
    1_000
}

fn default_dependency_resolution() -> bool {
    true
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            window_ms: default_batch_window_ms(),
            dependency_resolution: default_dependency_resolution(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Glob patterns (relative to the watch root) of files to react to.
    ///
    /// Empty means "everything not excluded".
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns of files to ignore.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Skip events whose file content hash is unchanged since the last
    /// observed event.
    #[serde(default = "default_skip_unchanged")]
    pub skip_unchanged: bool,

    /// Extensions counted as project source code by the importance heuristic.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
    ]
}

fn default_skip_unchanged() -> bool {
    true
}

fn default_source_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "py", "sh"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: default_exclude(),
            skip_unchanged: default_skip_unchanged(),
            source_extensions: default_source_extensions(),
        }
    }
}

/// Validated configuration.
///
/// Constructed only through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    batch: BatchSection,
    watch: WatchSection,
}

impl ConfigFile {
    /// Internal constructor used after validation has passed.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        batch: BatchSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            config,
            batch,
            watch,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn batch(&self) -> &BatchSection {
        &self.batch
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }
}
