// src/time.rs

//! Injectable clock abstraction.
//!
//! The scheduler core never calls `Instant::now()` directly; everything that
//! needs the current time reads it through a shared [`Clock`]. Production
//! code uses [`SystemClock`]; tests drive recency-based heuristics with a
//! manual clock (see the test-utils crate).
//!
//! The passage of time itself (debounce and batch-window timers) is not
//! modelled here: timers are commands emitted by the pure core and armed by
//! the async shell, so core logic is tested without sleeping at all.

use std::sync::Arc;
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Convenience: a shared system clock.
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
