//! Single-stream fallback for servers without byte-range support.

use std::sync::Arc;

use anyhow::Result;

use crate::fetcher::sink::{self, Expect, SinkTarget, TransferSink};
use crate::fetcher::{enter_downloading, finish, into_task_error, FetchContext};
use crate::storage::StorageWriterBuilder;
use crate::task::Task;

/// Plain GET copied sequentially into the destination. The size stays
/// unknown until the body ends; the final report carries the byte count.
pub(super) fn fetch(ctx: &FetchContext, task: &Arc<Task>) -> Result<()> {
    let storage = StorageWriterBuilder::create(task.destination())?.build();
    enter_downloading(task)?;
    let written = {
        let _sampling = ctx.sampler.register(task);
        let sink = TransferSink::new(
            Arc::clone(task),
            ctx.poll,
            SinkTarget::At(storage.clone()),
            Expect::Success,
        );
        sink::perform(task.url(), &ctx.curl, None, sink)
            .map_err(|e| into_task_error(e, format!("GET {}", task.url())))?
    };
    storage.sync()?;
    task.set_whole_file_size(Some(written));
    finish(task, Some(written), written)
}
