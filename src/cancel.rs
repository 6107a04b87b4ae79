// src/cancel.rs

//! One-shot cancellation token with late-subscribe semantics.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

type Callback = Box<dyn FnOnce() + Send>;

struct Inner {
    cancelled: bool,
    callbacks: Vec<Callback>,
}

/// Shareable one-shot cancellation signal.
///
/// - `cancel` is idempotent: the first call flips the flag and fires every
///   registered callback exactly once; later calls do nothing.
/// - A callback registered after cancellation fires immediately and
///   synchronously, so late observers can detect an already-cancelled run
///   without polling.
/// - There is no reset; once cancelled, permanently cancelled.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cancelled: false,
                callbacks: Vec::new(),
            })),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().expect("cancellation token lock").cancelled
    }

    /// Flip the token and fire all registered callbacks.
    ///
    /// Callbacks run outside the lock so they may freely register further
    /// callbacks (which then fire immediately).
    pub fn cancel(&self) {
        let fired = {
            let mut inner = self.inner.lock().expect("cancellation token lock");
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
            std::mem::take(&mut inner.callbacks)
        };

        debug!(callbacks = fired.len(), "cancellation token cancelled");
        for cb in fired {
            cb();
        }
    }

    /// Register a callback to run once on cancellation.
    ///
    /// If the token is already cancelled the callback runs synchronously
    /// before this method returns.
    pub fn on_cancelled<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().expect("cancellation token lock");
            if !inner.cancelled {
                inner.callbacks.push(Box::new(callback));
                return;
            }
        }

        callback();
    }
}
