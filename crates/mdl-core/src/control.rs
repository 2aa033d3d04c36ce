//! Pause/cancel control shared between a task handle and its transfer workers.
//!
//! Pause is cooperative: workers call [`TransferControl::checkpoint`] before
//! consuming each chunk. While the pause flag is set the worker sleeps for the
//! poll interval and re-checks, leaving its connection open and idle.
//! Cancellation is observed at the same checkpoint and makes the worker abort
//! its transfer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Hook run once when a task is cancelled (e.g. to close an outer resource).
pub type CancelHook = Box<dyn FnOnce() + Send>;

/// Outcome of a worker checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Cancelled,
}

#[derive(Default)]
pub struct TransferControl {
    paused: AtomicBool,
    cancelled: AtomicBool,
    hook: Mutex<Option<CancelHook>>,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Install the hook run by [`TransferControl::cancel`]. Replaces any earlier hook.
    pub fn set_cancel_hook(&self, hook: CancelHook) {
        *self.hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    /// Set the cancel flag and run the hook, if one was installed. The hook runs at most once.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        let hook = self.hook.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Block while paused, polling every `poll`. Returns `Cancelled` as soon as
    /// cancellation is observed, paused or not.
    pub fn checkpoint(&self, poll: Duration) -> Checkpoint {
        loop {
            if self.is_cancelled() {
                return Checkpoint::Cancelled;
            }
            if !self.is_paused() {
                return Checkpoint::Continue;
            }
            std::thread::sleep(poll);
        }
    }
}

impl std::fmt::Debug for TransferControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferControl")
            .field("paused", &self.is_paused())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
