use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::sync::Semaphore;

use watchrun::errors::Result;
use watchrun::exec::{ExecutionBackend, ExecutionRequest, ExecutionResult};

/// A fake execution backend that:
/// - records every request it starts (in dispatch order)
/// - resolves with scripted results (success by default)
/// - can be gated so executions only resolve when the test releases them
/// - counts cancellation calls, releasing the gated execution if any.
pub struct FakeBackend {
    executed: Arc<Mutex<Vec<ExecutionRequest>>>,
    results: Arc<Mutex<VecDeque<ExecutionResult>>>,
    gate: Option<Arc<Semaphore>>,
    cancel_count: Arc<Mutex<u32>>,
}

impl FakeBackend {
    /// Backend that resolves every request immediately with success.
    pub fn new(executed: Arc<Mutex<Vec<ExecutionRequest>>>) -> Self {
        Self {
            executed,
            results: Arc::new(Mutex::new(VecDeque::new())),
            gate: None,
            cancel_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Backend whose executions block until the returned semaphore receives
    /// a permit (`gate.add_permits(1)` releases exactly one execution).
    pub fn gated(executed: Arc<Mutex<Vec<ExecutionRequest>>>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            executed,
            results: Arc::new(Mutex::new(VecDeque::new())),
            gate: Some(Arc::clone(&gate)),
            cancel_count: Arc::new(Mutex::new(0)),
        };
        (backend, gate)
    }

    /// Script the result for a future request (FIFO). Requests beyond the
    /// scripted ones succeed.
    pub fn push_result(&self, result: ExecutionResult) {
        self.results.lock().unwrap().push_back(result);
    }

    /// How many times `cancel` was called.
    pub fn cancel_count(&self) -> u32 {
        *self.cancel_count.lock().unwrap()
    }

    /// Shareable view of the cancel counter, for asserting after the
    /// backend has been moved into a runtime.
    pub fn cancel_counter(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.cancel_count)
    }

    /// A successful result with the given duration.
    pub fn success(duration_ms: u64) -> ExecutionResult {
        ExecutionResult {
            success: true,
            output: String::new(),
            error: None,
            duration_ms,
            timestamp: SystemTime::now(),
        }
    }

    /// A failed result with the given error description.
    pub fn failure(duration_ms: u64, error: &str) -> ExecutionResult {
        ExecutionResult {
            success: false,
            output: String::new(),
            error: Some(error.to_string()),
            duration_ms,
            timestamp: SystemTime::now(),
        }
    }
}

impl ExecutionBackend for FakeBackend {
    fn execute(
        &mut self,
        request: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'static>> {
        let executed = Arc::clone(&self.executed);
        let results = Arc::clone(&self.results);
        let gate = self.gate.clone();

        Box::pin(async move {
            executed.lock().unwrap().push(request);

            if let Some(gate) = gate {
                let permit = gate.acquire().await.expect("gate semaphore closed");
                permit.forget();
            }

            let result = results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| FakeBackend::success(5));
            Ok(result)
        })
    }

    fn supports_cancellation(&self) -> bool {
        true
    }

    fn cancel(&mut self) {
        *self.cancel_count.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}
