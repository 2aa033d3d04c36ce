//! Segmented fetcher: manifest download, bounded segment pool with retry,
//! and an ordered merge into the destination.

mod manifest;
mod merge;
mod pool;
mod workdir;

pub use manifest::{parse_manifest, resolve_reference, segment_file_name};

use std::sync::Arc;

use anyhow::{Context, Result};

use super::FetchContext;
use crate::error::DownloadError;
use crate::http;
use crate::sampler::MERGE_PERCENT;
use crate::storage;
use crate::task::{ProgressEvent, Task, TaskStatus};
use workdir::WorkDir;

pub(crate) fn fetch(ctx: &FetchContext, task: &Arc<Task>) -> Result<()> {
    if !task.set_status(TaskStatus::Preparing) {
        return Err(DownloadError::Cancelled.into());
    }
    task.mark_started();
    let dest = task.destination();
    storage::ensure_parent_dir(dest)?;
    let workdir = WorkDir::create(dest)?;

    let body = http::fetch_text(task.url(), &ctx.curl)
        .with_context(|| format!("fetch manifest {}", task.url()))?;
    let segments = parse_manifest(task.url(), &body);
    if segments.is_empty() {
        return Err(DownloadError::EmptyManifest.into());
    }
    let total = segments.len() as u64;
    task.set_segment_count(total);
    tracing::info!(url = %task.url(), segments = total, "manifest parsed");

    super::enter_downloading(task)?;
    let failed = {
        let _sampling = ctx.sampler.register(task);
        pool::fetch_segments(ctx, task, workdir.path(), &segments)?
    };
    if failed > 0 {
        tracing::warn!(
            path = %dest.display(),
            missing = failed,
            total,
            "merging with missing segments"
        );
    }

    if !task.set_status(TaskStatus::Merging) {
        return Err(DownloadError::Cancelled.into());
    }
    task.report(ProgressEvent::new(
        MERGE_PERCENT,
        "merging",
        Some(task.downloaded_bytes()),
        None,
    ));
    let size = merge::merge_segments(workdir.path(), dest)?;
    drop(workdir);

    super::finish(task, None, size)
}
