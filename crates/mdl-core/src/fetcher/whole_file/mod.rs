//! Whole-file fetcher: HEAD probe, then parallel byte ranges written in place,
//! or a single sequential stream when the server does not do ranges.

mod range;
mod single;

use std::sync::Arc;

use anyhow::{Context, Result};

use super::FetchContext;
use crate::error::DownloadError;
use crate::probe;
use crate::segmenter::plan_ranges;
use crate::storage::{self, StorageWriterBuilder};
use crate::task::{Task, TaskStatus};

pub(crate) fn fetch(ctx: &FetchContext, task: &Arc<Task>) -> Result<()> {
    if !task.set_status(TaskStatus::Preparing) {
        return Err(DownloadError::Cancelled.into());
    }
    task.mark_started();
    let dest = task.destination();
    storage::ensure_parent_dir(dest)?;

    let head = probe::probe(task.url(), &ctx.curl)
        .with_context(|| format!("probe {}", task.url()))?;
    tracing::debug!(
        url = %task.url(),
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        "probe"
    );

    // A cancel during the probe must not leave a truncated destination behind.
    if task.control().is_cancelled() {
        return Err(DownloadError::Cancelled.into());
    }

    if !head.accept_ranges {
        tracing::info!(url = %task.url(), "no byte-range support, using a single stream");
        task.set_whole_file_size(None);
        return single::fetch(ctx, task);
    }

    let total = head.content_length.ok_or(DownloadError::MissingContentLength)?;
    if total == 0 {
        return Err(DownloadError::EmptyResource.into());
    }
    task.set_whole_file_size(Some(total));

    let mut builder = StorageWriterBuilder::create(dest)?;
    builder.preallocate(total)?;
    let storage = builder.build();

    let ranges = plan_ranges(total, ctx.per_file_threads);
    tracing::debug!(path = %dest.display(), total, ranges = ranges.len(), "range plan");

    super::enter_downloading(task)?;
    {
        let _sampling = ctx.sampler.register(task);
        range::fetch_ranges(ctx, task, &storage, &ranges)?;
    }
    storage.sync()?;
    super::finish(task, Some(total), total)
}
