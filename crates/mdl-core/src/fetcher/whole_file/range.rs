//! One ranged GET per planned byte range, all running at once.

use std::sync::Arc;

use anyhow::Result;

use crate::error::DownloadError;
use crate::fetcher::sink::{self, Expect, SinkTarget, TransferSink};
use crate::fetcher::{into_task_error, FetchContext};
use crate::retry::FetchError;
use crate::segmenter::ByteRange;
use crate::storage::StorageWriter;
use crate::task::Task;

/// Fetch every range on its own scoped thread and join them all.
///
/// Workers do not stop each other: a failed range leaves the rest running to
/// completion. If more than one fails, the error joined last is returned.
pub(super) fn fetch_ranges(
    ctx: &FetchContext,
    task: &Arc<Task>,
    storage: &StorageWriter,
    ranges: &[ByteRange],
) -> Result<()> {
    let mut last_err: Option<anyhow::Error> = None;
    std::thread::scope(|s| {
        let workers: Vec<_> = ranges
            .iter()
            .map(|&range| {
                let storage = storage.clone();
                (range, s.spawn(move || fetch_range(ctx, task, storage, range)))
            })
            .collect();
        for (range, worker) in workers {
            match worker.join() {
                Ok(Ok(n)) => {
                    tracing::trace!(range = %range.curl_range(), bytes = n, "range done");
                }
                Ok(Err(e)) => {
                    if !matches!(e, FetchError::Cancelled) {
                        tracing::warn!(range = %range.curl_range(), error = %e, "range failed");
                    }
                    last_err = Some(into_task_error(e, format!("range {}", range.curl_range())));
                }
                Err(_) => {
                    last_err = Some(anyhow::anyhow!("range {} worker panicked", range.curl_range()));
                }
            }
        }
    });
    if task.control().is_cancelled() {
        return Err(DownloadError::Cancelled.into());
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn fetch_range(
    ctx: &FetchContext,
    task: &Arc<Task>,
    storage: StorageWriter,
    range: ByteRange,
) -> Result<u64, FetchError> {
    let sink = TransferSink::new(Arc::clone(task), ctx.poll, SinkTarget::At(storage), Expect::Partial)
        .starting_at(range.start)
        .limited_to(range.len());
    sink::perform(task.url(), &ctx.curl, Some(&range.curl_range()), sink)
}
