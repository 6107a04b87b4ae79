use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use watchrun::time::Clock;

/// A clock tests advance by hand.
///
/// Starts at whatever "now" was at construction; only `advance` moves it.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
