use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Auto-resetting one-shot signal
///
/// `set` wakes a single waiter; the signal is consumed by the wait that observes it.
#[derive(Default)]
pub(crate) struct Event {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Event::default()
    }

    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cond.notify_one();
    }

    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Waits at most `timeout` for the signal, returns whether it was consumed
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }

        let consumed = *signaled;
        *signaled = false;
        consumed
    }
}
