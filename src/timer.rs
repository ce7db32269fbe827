use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

struct State {
    deadline: Option<Instant>,
    /// The callback is running
    firing: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

/// One-shot absolute timer backed by a dedicated thread
///
/// The callback runs on the timer thread once the armed deadline passes, never concurrently with
/// itself. It re-arms the timer by returning the next deadline; returning `None` leaves it idle
/// until `arm` is called again.
pub(crate) struct Timer {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl Timer {
    pub fn spawn<F>(name: &str, callback: F) -> io::Result<Self>
    where
        F: FnMut() -> Option<Instant> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                deadline: None,
                firing: false,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(name.to_owned())
                .spawn(move || run(&shared, callback))?
        };

        Ok(Timer {
            shared,
            worker_id: worker.thread().id(),
            worker: Some(worker),
        })
    }

    /// Schedules the callback at `at`, replacing any pending deadline
    pub fn arm(&self, at: Instant) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(at);
        self.shared.cond.notify_one();
    }

    /// Drops the pending deadline, if any
    pub fn cancel(&self) {
        self.shared.state.lock().deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }

    /// Neither armed nor running the callback
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.deadline.is_none() && !state.firing
    }

    /// Whether the timer thread is still able to run callbacks
    pub fn is_alive(&self) -> bool {
        self.worker.as_ref().map_or(false, |w| !w.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
            self.shared.cond.notify_all();
        }

        // the last handle may be released from within the callback itself
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run<F>(shared: &Shared, mut callback: F)
where
    F: FnMut() -> Option<Instant>,
{
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            break;
        }

        let at = match state.deadline {
            Some(at) => at,
            None => {
                shared.cond.wait(&mut state);
                continue;
            }
        };
        if Instant::now() < at {
            shared.cond.wait_until(&mut state, at);
            continue;
        }

        state.deadline = None;
        state.firing = true;
        let next = MutexGuard::unlocked(&mut state, &mut callback);
        state.firing = false;
        if let Some(next) = next {
            if !state.shutdown {
                state.deadline = Some(next);
            }
        }
    }

    trace!("timer thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn fires_once_when_not_rearmed() {
        let fired = Arc::new(AtomicU32::new(0));
        let timer = {
            let fired = Arc::clone(&fired);
            Timer::spawn("test-timer", move || {
                fired.fetch_add(1, Ordering::SeqCst);
                None
            })
            .unwrap()
        };

        timer.arm(Instant::now() + Duration::from_millis(5));
        assert!(wait_until(|| fired.load(Ordering::SeqCst) == 1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[test]
    fn callback_rearms_itself() {
        let fired = Arc::new(AtomicU32::new(0));
        let timer = {
            let fired = Arc::clone(&fired);
            Timer::spawn("test-timer", move || {
                let n = fired.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Some(Instant::now() + Duration::from_millis(2))
                } else {
                    None
                }
            })
            .unwrap()
        };

        timer.arm(Instant::now());
        assert!(wait_until(|| fired.load(Ordering::SeqCst) == 3));
        assert!(timer.is_alive());
    }

    #[test]
    fn drop_cancels_pending_deadline() {
        let fired = Arc::new(AtomicU32::new(0));
        let timer = {
            let fired = Arc::clone(&fired);
            Timer::spawn("test-timer", move || {
                fired.fetch_add(1, Ordering::SeqCst);
                None
            })
            .unwrap()
        };

        timer.arm(Instant::now() + Duration::from_secs(60));
        drop(timer);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn busy_while_callback_runs() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let timer = Timer::spawn("test-timer", move || {
            entered_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            None
        })
        .unwrap();
        assert!(timer.is_idle());

        timer.arm(Instant::now());
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!timer.is_armed());
        assert!(!timer.is_idle());

        release_tx.send(()).unwrap();
        assert!(wait_until(|| timer.is_idle()));
    }

    #[test]
    fn cancel_disarms() {
        let timer = Timer::spawn("test-timer", || None).unwrap();
        timer.arm(Instant::now() + Duration::from_secs(60));
        assert!(timer.is_armed());
        timer.cancel();
        assert!(!timer.is_armed());
    }
}
