//! Download task: the unit of work and its observable state.
//!
//! A task is identified by its destination path. Counters are atomics and the
//! status lives behind its own lock, so readers never wait on transfer I/O.

mod progress;
mod status;

pub use progress::{ProgressEvent, ProgressFn, UNKNOWN};
pub use status::TaskStatus;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::control::{CancelHook, Checkpoint, TransferControl};

/// What kind of transfer a task is, and how big it is once known.
///
/// The variant is fixed when the task is registered; only the size inside it
/// is filled in later (after the probe or manifest parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Addressed by byte offset. `size` is `None` until probed; a
    /// single-stream fallback keeps it `None` until the body has ended.
    WholeFile { size: Option<u64> },
    /// Chunked manifest. `segment_count` is `None` until the manifest is parsed.
    Segmented { segment_count: Option<u64> },
}

impl TransferKind {
    pub fn is_segmented(&self) -> bool {
        matches!(self, TransferKind::Segmented { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Done,
}

pub struct Task {
    url: String,
    destination: PathBuf,
    kind: Mutex<TransferKind>,
    downloaded_bytes: AtomicU64,
    downloaded_segments: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    status: RwLock<TaskStatus>,
    control: TransferControl,
    error: Mutex<Option<Arc<anyhow::Error>>>,
    progress: Option<ProgressFn>,
    run_state: Mutex<RunState>,
    done: Condvar,
}

impl Task {
    pub(crate) fn new(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        kind: TransferKind,
        progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            kind: Mutex::new(kind),
            downloaded_bytes: AtomicU64::new(0),
            downloaded_segments: AtomicU64::new(0),
            started_at: Mutex::new(None),
            status: RwLock::new(TaskStatus::Pending),
            control: TransferControl::new(),
            error: Mutex::new(None),
            progress,
            run_state: Mutex::new(RunState::Idle),
            done: Condvar::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn kind(&self) -> TransferKind {
        *self.kind.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` if the state machine allows it. Returns whether the
    /// transition happened; a task in a terminal state never changes again.
    pub fn set_status(&self, next: TaskStatus) -> bool {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        let from = *status;
        if !from.can_transition_to(next) {
            tracing::trace!(
                path = %self.destination.display(),
                from = %from,
                to = %next,
                "status transition ignored"
            );
            return false;
        }
        tracing::debug!(
            path = %self.destination.display(),
            from = %from,
            to = %next,
            "status"
        );
        *status = next;
        true
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    pub fn downloaded_segments(&self) -> u64 {
        self.downloaded_segments.load(Ordering::Relaxed)
    }

    /// Segments that never arrived. `None` for whole-file tasks, or while the
    /// segmented task is still fetching.
    pub fn missing_segments(&self) -> Option<u64> {
        match self.kind() {
            TransferKind::Segmented {
                segment_count: Some(total),
            } if matches!(
                self.status(),
                TaskStatus::Merging | TaskStatus::Completed | TaskStatus::Error
            ) =>
            {
                Some(total.saturating_sub(self.downloaded_segments()))
            }
            _ => None,
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        *self.started_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at().map(|t| t.elapsed())
    }

    /// Terminal error, set when the task ends in `error`.
    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub(crate) fn control(&self) -> &TransferControl {
        &self.control
    }

    pub(crate) fn checkpoint(&self, poll: Duration) -> Checkpoint {
        self.control.checkpoint(poll)
    }

    pub(crate) fn set_whole_file_size(&self, size: Option<u64>) {
        let mut kind = self.kind.lock().unwrap_or_else(PoisonError::into_inner);
        if let TransferKind::WholeFile { .. } = *kind {
            *kind = TransferKind::WholeFile { size };
        }
    }

    pub(crate) fn set_segment_count(&self, count: u64) {
        let mut kind = self.kind.lock().unwrap_or_else(PoisonError::into_inner);
        if let TransferKind::Segmented { .. } = *kind {
            *kind = TransferKind::Segmented {
                segment_count: Some(count),
            };
        }
    }

    pub(crate) fn add_bytes(&self, n: u64) {
        self.downloaded_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_segment(&self) {
        self.downloaded_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_started(&self) {
        *self.started_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub(crate) fn set_error(&self, err: anyhow::Error) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(err));
    }

    /// Invoke the progress callback, if any.
    pub(crate) fn report(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }

    pub(crate) fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.run_state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != RunState::Idle {
            return false;
        }
        *state = RunState::Running;
        true
    }

    pub(crate) fn mark_done(&self) {
        *self.run_state.lock().unwrap_or_else(PoisonError::into_inner) = RunState::Done;
        self.done.notify_all();
    }

    fn wait_done(&self, timeout: Option<Duration>) -> bool {
        let state = self.run_state.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            None => {
                let _state = self
                    .done
                    .wait_while(state, |s| *s == RunState::Running)
                    .unwrap_or_else(PoisonError::into_inner);
                true
            }
            Some(t) => {
                let (state, _) = self
                    .done
                    .wait_timeout_while(state, t, |s| *s == RunState::Running)
                    .unwrap_or_else(PoisonError::into_inner);
                *state != RunState::Running
            }
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("url", &self.url)
            .field("destination", &self.destination)
            .field("kind", &self.kind())
            .field("status", &self.status())
            .field("downloaded_bytes", &self.downloaded_bytes())
            .field("downloaded_segments", &self.downloaded_segments())
            .finish()
    }
}

/// Shared handle to a registered task.
#[derive(Debug, Clone)]
pub struct TaskHandle(Arc<Task>);

impl TaskHandle {
    pub(crate) fn new(task: Task) -> Self {
        Self(Arc::new(task))
    }

    pub(crate) fn task(&self) -> &Arc<Task> {
        &self.0
    }

    /// Stop advancing at the next checkpoint. In-flight connections stay open.
    pub fn pause(&self) {
        tracing::debug!(path = %self.0.destination.display(), "pause");
        self.0.control.pause();
    }

    pub fn resume(&self) {
        tracing::debug!(path = %self.0.destination.display(), "resume");
        self.0.control.resume();
    }

    /// Mark the task `cancelled` and run its cancel hook, if installed.
    /// Workers abort their transfers at their next checkpoint. No-op once the
    /// task is terminal.
    pub fn cancel(&self) {
        if self.0.set_status(TaskStatus::Cancelled) {
            tracing::info!(path = %self.0.destination.display(), "cancelled");
            self.0.control.cancel();
        }
    }

    /// Install a hook run once by [`TaskHandle::cancel`].
    pub fn set_cancel_hook(&self, hook: CancelHook) {
        self.0.control.set_cancel_hook(hook);
    }

    /// Block until the task's worker has finished. Returns immediately if the
    /// task was never started.
    pub fn wait(&self) {
        self.0.wait_done(None);
    }

    /// Like [`TaskHandle::wait`] with an upper bound. Returns false on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.0.wait_done(Some(timeout))
    }

    pub fn status(&self) -> TaskStatus {
        self.0.status()
    }

    pub fn set_status(&self, next: TaskStatus) -> bool {
        self.0.set_status(next)
    }

    pub fn url(&self) -> &str {
        self.0.url()
    }

    pub fn destination(&self) -> &Path {
        self.0.destination()
    }

    pub fn kind(&self) -> TransferKind {
        self.0.kind()
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.0.downloaded_bytes()
    }

    pub fn downloaded_segments(&self) -> u64 {
        self.0.downloaded_segments()
    }

    pub fn missing_segments(&self) -> Option<u64> {
        self.0.missing_segments()
    }

    pub fn is_paused(&self) -> bool {
        self.0.is_paused()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.0.started_at()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.0.elapsed()
    }

    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.0.error()
    }
}
