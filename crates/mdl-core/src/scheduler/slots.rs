//! Counting semaphore bounding how many file downloads run at once.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// At most `max` holders at a time; [`FileSlots::acquire`] blocks until a
/// slot frees up.
#[derive(Debug)]
pub(crate) struct FileSlots {
    max: usize,
    in_use: Mutex<usize>,
    freed: Condvar,
}

impl FileSlots {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            in_use: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    /// Block until a slot is free and take it. The slot is returned when the
    /// guard drops.
    pub(crate) fn acquire(self: &Arc<Self>) -> SlotGuard {
        let in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        let mut in_use = self
            .freed
            .wait_while(in_use, |n| *n >= self.max)
            .unwrap_or_else(PoisonError::into_inner);
        *in_use += 1;
        SlotGuard {
            slots: Arc::clone(self),
        }
    }

    pub(crate) fn in_use(&self) -> usize {
        *self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held file slot.
#[derive(Debug)]
pub(crate) struct SlotGuard {
    slots: Arc<FileSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut in_use = self.slots.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        *in_use = in_use.saturating_sub(1);
        self.slots.freed.notify_one();
    }
}
