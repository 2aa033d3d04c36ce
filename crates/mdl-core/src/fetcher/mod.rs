//! Transfer engines: whole-file (byte ranges) and segmented (manifest).
//!
//! Both run on the calling thread and spawn their own bounded worker set.
//! They return `Err(DownloadError::Cancelled)` when the task was cancelled
//! mid-run; the scheduler treats that as a quiet exit, not a failure.

mod segmented;
mod sink;
mod whole_file;

pub use segmented::{parse_manifest, resolve_reference, segment_file_name};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::MdlConfig;
use crate::error::DownloadError;
use crate::http::CurlOptions;
use crate::retry::{FetchError, RetryPolicy};
use crate::sampler::ThroughputSampler;
use crate::task::{ProgressEvent, Task, TaskStatus, TransferKind};

/// Everything a fetcher needs besides the task itself.
#[derive(Clone)]
pub(crate) struct FetchContext {
    pub(crate) curl: CurlOptions,
    pub(crate) retry: RetryPolicy,
    pub(crate) per_file_threads: usize,
    pub(crate) poll: Duration,
    pub(crate) sampler: ThroughputSampler,
}

impl FetchContext {
    pub(crate) fn new(cfg: &MdlConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            curl: CurlOptions::from(&cfg),
            retry: RetryPolicy::from(&cfg.segment_retry),
            per_file_threads: cfg.per_file_threads,
            poll: cfg.poll_interval(),
            sampler: ThroughputSampler::new(cfg.sample_interval()),
        }
    }
}

/// Run the fetcher matching the task's transfer kind.
pub(crate) fn run(ctx: &FetchContext, task: &Arc<Task>) -> Result<()> {
    match task.kind() {
        TransferKind::WholeFile { .. } => whole_file::fetch(ctx, task),
        TransferKind::Segmented { .. } => segmented::fetch(ctx, task),
    }
}

/// Per-request error to task-level error; cancellation keeps its typed form.
pub(crate) fn into_task_error(err: FetchError, what: impl Into<String>) -> anyhow::Error {
    match err {
        FetchError::Cancelled => DownloadError::Cancelled.into(),
        other => anyhow::Error::new(other).context(what.into()),
    }
}

/// Enter `downloading`; fails only when the task was cancelled meanwhile.
pub(crate) fn enter_downloading(task: &Task) -> Result<()> {
    if task.set_status(TaskStatus::Downloading) {
        Ok(())
    } else {
        Err(DownloadError::Cancelled.into())
    }
}

/// Mark the task completed and send the exact final report.
pub(crate) fn finish(task: &Task, current: Option<u64>, total: u64) -> Result<()> {
    if !task.set_status(TaskStatus::Completed) {
        return Err(DownloadError::Cancelled.into());
    }
    tracing::info!(
        path = %task.destination().display(),
        bytes = total,
        elapsed_ms = task.elapsed().map_or(0, |d| d.as_millis() as u64),
        "download completed"
    );
    task.report(ProgressEvent::new(100.0, "Completed", current, Some(total)));
    Ok(())
}
