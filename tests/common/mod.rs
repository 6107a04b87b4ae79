#![allow(dead_code)]

pub use watchrun_test_utils::builders::ConfigBuilder;
pub use watchrun_test_utils::clock::ManualClock;
pub use watchrun_test_utils::fake_backend::FakeBackend;
pub use watchrun_test_utils::{init_tracing, with_timeout};

use std::time::Duration;

/// Poll `cond` every 10ms until it holds, or panic after 2 seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
