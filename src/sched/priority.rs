// src/sched/priority.rs

//! Priority factors and the adaptive debounce-delay computation.
//!
//! Everything here is pure: factors are derived on demand from the metrics
//! collector and immediately consumed; nothing is stored.

use crate::metrics::MetricsCollector;

/// Lower bound on any computed debounce delay.
pub const MIN_DELAY_MS: u64 = 100;
/// Upper bound on any computed debounce delay.
pub const MAX_DELAY_MS: u64 = 5_000;

/// Path fragments that mark a file as an entry point.
const ENTRYPOINT_MARKERS: [&str; 3] = ["main", "index", "app"];
/// Path fragments that mark a `.json` file as project configuration.
const CONFIG_MARKERS: [&str; 2] = ["package", "config"];
/// Path fragments that mark a file as test code.
const TEST_MARKERS: [&str; 2] = ["test", "spec"];

/// Heuristic inputs for the adaptive delay, derived per scheduling decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityFactors {
    /// Importance score in `[1, 10]`, from the path heuristic.
    pub file_importance: u8,
    /// How often this file has changed.
    pub change_frequency: u32,
    /// Fan-in + fan-out from the stored dependency info.
    pub dependency_weight: usize,
    /// Whole minutes since this file last ran, `None` if it never has.
    pub minutes_since_last_run: Option<u64>,
    /// Explicit run-now requests for this file.
    pub user_interaction: u32,
}

impl PriorityFactors {
    /// Derive the factors for `path` from the collector's history.
    pub fn derive(path: &str, metrics: &MetricsCollector, source_extensions: &[String]) -> Self {
        Self {
            file_importance: file_importance(path, source_extensions),
            change_frequency: metrics.change_frequency(path),
            dependency_weight: metrics.dependency_weight(path),
            minutes_since_last_run: metrics.minutes_since_last_execution(path),
            user_interaction: metrics.user_interaction(path),
        }
    }
}

/// Score how much a file matters, from its path alone.
///
/// Base 5, nudged by entry-point markers, config files, source extensions
/// and test markers, clamped to `[1, 10]`.
pub fn file_importance(path: &str, source_extensions: &[String]) -> u8 {
    let lower = path.to_lowercase();
    let mut score: i32 = 5;

    if ENTRYPOINT_MARKERS.iter().any(|m| lower.contains(m)) {
        score += 3;
    }

    if lower.ends_with(".json") && CONFIG_MARKERS.iter().any(|m| lower.contains(m)) {
        score += 2;
    }

    if let Some((_, ext)) = lower.rsplit_once('.') {
        if source_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            score += 1;
        }
    }

    if TEST_MARKERS.iter().any(|m| lower.contains(m)) {
        score -= 2;
    }

    score.clamp(1, 10) as u8
}

/// Multiplier applied to the base debounce delay.
///
/// Important and depended-upon files shrink the delay (run sooner); rapidly
/// churning files stretch it (let the burst settle); a very recent run
/// stretches it slightly to avoid hammering the backend.
fn delay_multiplier(factors: &PriorityFactors) -> f64 {
    let mut multiplier = 1.0;

    if factors.file_importance >= 8 {
        multiplier *= 0.5;
    } else if factors.file_importance >= 6 {
        multiplier *= 0.7;
    }

    if factors.change_frequency > 10 {
        multiplier *= 2.0;
    } else if factors.change_frequency > 5 {
        multiplier *= 1.5;
    }

    if factors.dependency_weight >= 5 {
        multiplier *= 0.6;
    }

    if matches!(factors.minutes_since_last_run, Some(mins) if mins <= 2) {
        multiplier *= 1.5;
    }

    multiplier
}

/// Compute the effective debounce delay for a file.
///
/// Always within `[MIN_DELAY_MS, MAX_DELAY_MS]` regardless of input.
pub fn adaptive_delay_ms(base_delay_ms: u64, factors: &PriorityFactors) -> u64 {
    let scaled = base_delay_ms as f64 * delay_multiplier(factors);
    scaled.clamp(MIN_DELAY_MS as f64, MAX_DELAY_MS as f64).round() as u64
}
