// src/metrics.rs

//! Rolling execution statistics and per-file history.
//!
//! The collector feeds the adaptive scheduling heuristics: change frequency,
//! recency of the last run, explicit run-now requests, and the externally
//! supplied dependency graph. Execution durations are averaged over a rolling
//! window of the most recent samples; older samples are discarded, not
//! decayed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::time::Clock;

/// Number of duration samples the rolling averages keep.
const ROLLING_WINDOW: usize = 100;

/// Dependency information for a single file.
///
/// Supplied externally (the core never computes dependencies itself) and used
/// purely as sort input for batch ordering and as a priority factor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDependency {
    /// Paths this file depends on.
    pub dependencies: HashSet<String>,
    /// Paths that depend on this file.
    pub dependents: HashSet<String>,
}

impl FileDependency {
    /// Combined fan-in + fan-out, the `dependency_weight` priority factor.
    pub fn weight(&self) -> usize {
        self.dependencies.len() + self.dependents.len()
    }
}

/// Aggregate execution statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Rolling average over the last `ROLLING_WINDOW` execution durations.
    pub average_execution_time_ms: f64,
    /// Rolling average of how long entries waited in the queue.
    pub queue_processing_time_ms: f64,
    /// When the most recent execution (success or failure) finished.
    pub last_execution: Option<Instant>,
}

/// Collector of execution statistics and per-file scheduling history.
pub struct MetricsCollector {
    clock: Arc<dyn Clock>,

    total_executions: u64,
    successful_executions: u64,
    failed_executions: u64,
    execution_times: VecDeque<u64>,
    queue_waits: VecDeque<u64>,
    last_execution: Option<Instant>,

    change_counts: HashMap<String, u32>,
    manual_requests: HashMap<String, u32>,
    last_run: HashMap<String, Instant>,
    dependencies: HashMap<String, FileDependency>,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("total_executions", &self.total_executions)
            .field("successful_executions", &self.successful_executions)
            .field("failed_executions", &self.failed_executions)
            .finish_non_exhaustive()
    }
}

impl MetricsCollector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            total_executions: 0,
            successful_executions: 0,
            failed_executions: 0,
            execution_times: VecDeque::with_capacity(ROLLING_WINDOW),
            queue_waits: VecDeque::with_capacity(ROLLING_WINDOW),
            last_execution: None,
            change_counts: HashMap::new(),
            manual_requests: HashMap::new(),
            last_run: HashMap::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Record a successful execution of `path` that took `duration_ms`.
    pub fn record_success(&mut self, path: &str, duration_ms: u64) {
        self.successful_executions += 1;
        self.record_execution(path, duration_ms);
    }

    /// Record a failed execution of `path` that took `duration_ms`.
    ///
    /// Backend timeouts and infrastructure errors both land here; the
    /// distinction is reported through hooks, not the statistics.
    pub fn record_failure(&mut self, path: &str, duration_ms: u64) {
        self.failed_executions += 1;
        self.record_execution(path, duration_ms);
    }

    fn record_execution(&mut self, path: &str, duration_ms: u64) {
        self.total_executions += 1;
        push_sample(&mut self.execution_times, duration_ms);

        let now = self.clock.now();
        self.last_execution = Some(now);
        self.last_run.insert(path.to_string(), now);

        debug!(
            path,
            duration_ms,
            total = self.total_executions,
            "recorded execution"
        );
    }

    /// Record how long an entry waited in the queue before dispatch.
    pub fn record_queue_wait(&mut self, wait: Duration) {
        push_sample(&mut self.queue_waits, wait.as_millis() as u64);
    }

    /// Bump the change counter for `path`.
    pub fn update_change_frequency(&mut self, path: &str) {
        *self.change_counts.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn change_frequency(&self, path: &str) -> u32 {
        self.change_counts.get(path).copied().unwrap_or(0)
    }

    /// Record an explicit run-now request for `path`.
    pub fn record_manual_request(&mut self, path: &str) {
        *self.manual_requests.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn user_interaction(&self, path: &str) -> u32 {
        self.manual_requests.get(path).copied().unwrap_or(0)
    }

    /// Whole minutes since `path` last finished executing, `None` if never.
    pub fn minutes_since_last_execution(&self, path: &str) -> Option<u64> {
        let last = self.last_run.get(path)?;
        let elapsed = self.clock.now().saturating_duration_since(*last);
        Some(elapsed.as_secs() / 60)
    }

    /// Replace the stored dependency info for `path`.
    pub fn set_file_dependency(&mut self, path: &str, dep: FileDependency) {
        self.dependencies.insert(path.to_string(), dep);
    }

    pub fn file_dependency(&self, path: &str) -> Option<&FileDependency> {
        self.dependencies.get(path)
    }

    /// Fan-in + fan-out of `path`, 0 if no dependency info is stored.
    pub fn dependency_weight(&self, path: &str) -> usize {
        self.dependencies.get(path).map_or(0, FileDependency::weight)
    }

    /// Current aggregate statistics.
    pub fn metrics(&self) -> ExecutionMetrics {
        ExecutionMetrics {
            total_executions: self.total_executions,
            successful_executions: self.successful_executions,
            failed_executions: self.failed_executions,
            average_execution_time_ms: rolling_average(&self.execution_times),
            queue_processing_time_ms: rolling_average(&self.queue_waits),
            last_execution: self.last_execution,
        }
    }

    pub fn total_executions(&self) -> u64 {
        self.total_executions
    }

    /// Successful executions as a percentage of the total, 0 when nothing
    /// has run yet.
    pub fn success_rate(&self) -> f64 {
        rate(self.successful_executions, self.total_executions)
    }

    /// Failed executions as a percentage of the total, 0 when nothing has
    /// run yet.
    pub fn failure_rate(&self) -> f64 {
        rate(self.failed_executions, self.total_executions)
    }

    /// Discard all statistics and per-file history, keeping the clock.
    pub fn reset(&mut self) {
        self.total_executions = 0;
        self.successful_executions = 0;
        self.failed_executions = 0;
        self.execution_times.clear();
        self.queue_waits.clear();
        self.last_execution = None;
        self.change_counts.clear();
        self.manual_requests.clear();
        self.last_run.clear();
        self.dependencies.clear();
    }
}

fn push_sample(window: &mut VecDeque<u64>, sample: u64) {
    if window.len() == ROLLING_WINDOW {
        window.pop_front();
    }
    window.push_back(sample);
}

fn rolling_average(window: &VecDeque<u64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<u64>() as f64 / window.len() as f64
}

fn rate(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
