//! Playback completion gate
//!
//! Hands the "segment finished" signal from the engine thread (or the
//! operator interrupt path) to the control thread blocked in `wait()`.
//! One `notify()` releases exactly one `wait()`; the flag clears as the
//! waiter returns, so the same instance serves every verse.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// One-shot, self-resetting wait/notify gate
#[derive(Debug, Default)]
pub struct Synchronizer {
    finished: Mutex<bool>,
    condvar: Condvar,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // The guarded value is a plain flag; a panicking holder cannot leave it torn
        self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until notified, then clear the flag for the next cycle
    pub fn wait(&self) {
        let guard = self.lock();
        let mut finished = self
            .condvar
            .wait_while(guard, |finished| !*finished)
            .unwrap_or_else(PoisonError::into_inner);
        *finished = false;
        trace!("Synchronizer released waiter");
    }

    /// Signal completion. Safe before any waiter exists; repeated calls
    /// before the next `wait()` collapse into one.
    pub fn notify(&self) {
        {
            let mut finished = self.lock();
            *finished = true;
        }
        self.condvar.notify_one();
    }

    /// Drop a pending notification without waking anyone
    pub fn reset(&self) {
        *self.lock() = false;
    }
}
