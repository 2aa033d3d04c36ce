//! Bounded worker pool fetching segments into the work directory.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use super::manifest::segment_file_name;
use crate::error::DownloadError;
use crate::fetcher::sink::{self, Expect, SinkTarget, TransferSink};
use crate::fetcher::FetchContext;
use crate::retry::{run_with_retry, FetchError};
use crate::task::Task;

/// Fetch every segment with at most `per_file_threads` in flight.
///
/// A segment that still fails after the retry policy gives up is left out
/// (its file is removed) and the pool carries on. Returns the number of
/// segments that failed, or `Cancelled` if the task was cancelled.
pub(super) fn fetch_segments(
    ctx: &FetchContext,
    task: &Arc<Task>,
    dir: &Path,
    urls: &[String],
) -> Result<usize> {
    let total = urls.len();
    let work: Mutex<VecDeque<usize>> = Mutex::new((0..total).collect());
    let workers = ctx.per_file_threads.min(total);
    let (tx, rx) = mpsc::channel::<(usize, Result<u64, FetchError>)>();
    let mut failed = 0usize;

    std::thread::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let work = &work;
            s.spawn(move || loop {
                if task.control().is_cancelled() {
                    break;
                }
                let next = work.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
                let Some(index) = next else { break };
                let path = dir.join(segment_file_name(index, total));
                let res = run_with_retry(&ctx.retry, |_attempt| {
                    fetch_segment(ctx, task, &urls[index], &path)
                });
                if res.is_err() {
                    let _ = fs::remove_file(&path);
                }
                if tx.send((index, res)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (index, res) in rx {
            match res {
                Ok(bytes) => {
                    task.add_bytes(bytes);
                    task.add_segment();
                }
                Err(FetchError::Cancelled) => {}
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        segment = index,
                        url = %urls[index],
                        error = %e,
                        "segment failed after retries, leaving it out"
                    );
                }
            }
        }
    });

    if task.control().is_cancelled() {
        return Err(DownloadError::Cancelled.into());
    }
    Ok(failed)
}

/// One attempt: GET the segment into a freshly truncated file.
fn fetch_segment(ctx: &FetchContext, task: &Arc<Task>, url: &str, path: &Path) -> Result<u64, FetchError> {
    let file = File::create(path).map_err(FetchError::Storage)?;
    let sink = TransferSink::new(Arc::clone(task), ctx.poll, SinkTarget::File(file), Expect::Success)
        .uncounted();
    sink::perform(url, &ctx.curl, None, sink)
}
