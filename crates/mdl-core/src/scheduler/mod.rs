//! Task scheduler.
//!
//! Registers tasks, starts each on its own thread, and bounds how many file
//! downloads run at once with a counting semaphore of `concurrent_files`
//! slots. Each task is routed to the whole-file or segmented fetcher by URL
//! shape. A failed task is marked `error` and reported through its progress
//! callback; the scheduler never retries a task.

mod choose;
mod slots;

pub use choose::is_manifest_url;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::MdlConfig;
use crate::error;
use crate::fetcher::{self, FetchContext};
use crate::task::{ProgressEvent, ProgressFn, Task, TaskHandle, TaskStatus};

use slots::FileSlots;

#[derive(Default)]
struct Registry {
    /// Every registered task, in registration order.
    tasks: Vec<TaskHandle>,
    /// Registered but not yet started.
    queued: VecDeque<TaskHandle>,
}

pub struct Scheduler {
    ctx: FetchContext,
    slots: Arc<FileSlots>,
    registry: Mutex<Registry>,
}

impl Scheduler {
    pub fn new(cfg: &MdlConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            ctx: FetchContext::new(&cfg),
            slots: Arc::new(FileSlots::new(cfg.concurrent_files)),
            registry: Mutex::new(Registry::default()),
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a download of `url` to `destination`. The task waits in the
    /// queue until [`Scheduler::start`].
    ///
    /// Tasks are identified by destination: registering the same destination
    /// again returns the existing handle.
    pub fn add_task(
        &self,
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        progress: Option<ProgressFn>,
    ) -> TaskHandle {
        let url = url.into();
        let destination = destination.into();
        let mut reg = self.registry();
        if let Some(existing) = reg.tasks.iter().find(|t| t.destination() == destination) {
            tracing::debug!(path = %destination.display(), "task already registered");
            return existing.clone();
        }
        let kind = choose::transfer_kind_for(&url);
        tracing::info!(
            url = %url,
            path = %destination.display(),
            segmented = kind.is_segmented(),
            "task registered"
        );
        let handle = TaskHandle::new(Task::new(url, destination, kind, progress));
        reg.tasks.push(handle.clone());
        reg.queued.push_back(handle.clone());
        handle
    }

    /// Launch every queued task on its own thread. At most `concurrent_files`
    /// of them transfer at once; the rest block waiting for a slot. Returns
    /// the number of tasks launched.
    pub fn start(&self) -> usize {
        let queued: Vec<TaskHandle> = self.registry().queued.drain(..).collect();
        let mut launched = 0;
        for handle in queued {
            if !handle.task().mark_running() {
                continue;
            }
            let ctx = self.ctx.clone();
            let slots = Arc::clone(&self.slots);
            let task = Arc::clone(handle.task());
            let spawned = std::thread::Builder::new()
                .name("mdl-task".into())
                .spawn(move || run_task(&ctx, &slots, &task));
            match spawned {
                Ok(_) => launched += 1,
                Err(e) => {
                    let task = handle.task();
                    tracing::error!(path = %task.destination().display(), error = %e, "could not spawn task thread");
                    fail(task, anyhow::Error::new(e).context("spawn task thread"));
                    task.mark_done();
                }
            }
        }
        launched
    }

    /// All registered tasks in registration order.
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.registry().tasks.clone()
    }

    /// The task writing to `destination`, if any.
    pub fn task(&self, destination: &Path) -> Option<TaskHandle> {
        self.registry()
            .tasks
            .iter()
            .find(|t| t.destination() == destination)
            .cloned()
    }

    pub fn pause_all(&self) {
        for t in self.tasks() {
            t.pause();
        }
    }

    pub fn resume_all(&self) {
        for t in self.tasks() {
            t.resume();
        }
    }

    /// Cancel every task that has not reached a terminal state.
    pub fn cancel_all(&self) {
        for t in self.tasks() {
            t.cancel();
        }
    }

    /// Block until every started task has finished.
    pub fn wait_all(&self) {
        for t in self.tasks() {
            t.wait();
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.registry().tasks.len())
            .field("slots_in_use", &self.slots.in_use())
            .finish()
    }
}

/// Marks the task done however the worker exits.
struct DoneOnDrop<'a>(&'a Task);

impl Drop for DoneOnDrop<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

fn run_task(ctx: &FetchContext, slots: &Arc<FileSlots>, task: &Arc<Task>) {
    let _done = DoneOnDrop(task.as_ref());
    let _slot = slots.acquire();
    if task.status().is_terminal() {
        tracing::debug!(path = %task.destination().display(), "task ended before it started");
        return;
    }
    tracing::info!(url = %task.url(), path = %task.destination().display(), "task started");
    match fetcher::run(ctx, task) {
        Ok(()) => {}
        Err(e) if error::is_cancelled(&e) => {
            tracing::info!(path = %task.destination().display(), "task stopped after cancel");
        }
        Err(e) => {
            let msg = format!("{e:#}");
            tracing::error!(path = %task.destination().display(), error = %msg, "task failed");
            fail(task, e);
        }
    }
}

/// Move the task to `error`, keep the error, and report it through the callback.
fn fail(task: &Task, err: anyhow::Error) {
    let label = format!("error: {err:#}");
    if task.set_status(TaskStatus::Error) {
        task.set_error(err);
        task.report(ProgressEvent::new(0.0, label, None, None));
    }
}
