//! Easy2 handler shared by every fetcher.
//!
//! Checks the response status before the first body byte is written, honours
//! pause/cancel at each chunk, and writes either at an offset in a shared
//! destination file or sequentially into a private file.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::control::Checkpoint;
use crate::http::{self, CurlOptions};
use crate::retry::FetchError;
use crate::storage::StorageWriter;
use crate::task::Task;

/// Where accepted body bytes go.
pub(crate) enum SinkTarget {
    /// Offset writes into a preallocated (or growing) destination.
    At(StorageWriter),
    /// Sequential writes into a file owned by this transfer.
    File(File),
}

/// Which response codes the body may be accepted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    /// 206 for a range request.
    Partial,
    /// Any 2xx.
    Success,
}

pub(crate) struct TransferSink {
    task: Arc<Task>,
    poll: Duration,
    target: SinkTarget,
    offset: u64,
    written: u64,
    limit: Option<u64>,
    expect: Expect,
    headers: Vec<String>,
    checked: bool,
    count_bytes: bool,
    failure: Option<FetchError>,
}

impl TransferSink {
    pub(crate) fn new(task: Arc<Task>, poll: Duration, target: SinkTarget, expect: Expect) -> Self {
        Self {
            task,
            poll,
            target,
            offset: 0,
            written: 0,
            limit: None,
            expect,
            headers: Vec::new(),
            checked: false,
            count_bytes: true,
            failure: None,
        }
    }

    /// First offset written in the destination.
    pub(crate) fn starting_at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Accept at most `limit` bytes; fewer is reported as a partial transfer.
    pub(crate) fn limited_to(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Leave the task's byte counter alone; the caller adds bytes itself once
    /// the whole transfer succeeded.
    pub(crate) fn uncounted(mut self) -> Self {
        self.count_bytes = false;
        self
    }

    #[cfg(test)]
    fn written(&self) -> u64 {
        self.written
    }

    fn store(&mut self, data: &[u8]) -> std::io::Result<()> {
        match &mut self.target {
            SinkTarget::At(w) => w.write_at(self.offset + self.written, data),
            SinkTarget::File(f) => f.write_all(data),
        }
    }

    fn status_accepted(&self, code: u32) -> bool {
        match self.expect {
            Expect::Partial => code == 206,
            Expect::Success => (200..300).contains(&code),
        }
    }
}

impl curl::easy::Handler for TransferSink {
    fn header(&mut self, data: &[u8]) -> bool {
        http::push_header_line(&mut self.headers, data);
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        if self.task.checkpoint(self.poll) == Checkpoint::Cancelled {
            self.failure = Some(FetchError::Cancelled);
            return Ok(0);
        }
        if !self.checked {
            self.checked = true;
            // No parseable status line: leave it to the response code check in perform().
            match http::parse_http_status(&self.headers) {
                Some(code) if self.status_accepted(code) => {}
                Some(code) => {
                    self.failure = Some(FetchError::Http(code));
                    return Ok(0);
                }
                None => {}
            }
        }
        let take = match self.limit {
            Some(limit) => (limit.saturating_sub(self.written) as usize).min(data.len()),
            None => data.len(),
        };
        if take > 0 {
            if let Err(e) = self.store(&data[..take]) {
                self.failure = Some(FetchError::Storage(e));
                return Ok(0);
            }
            self.written += take as u64;
            if self.count_bytes {
                self.task.add_bytes(take as u64);
            }
        }
        // Bytes past the limit are dropped; returning the full length keeps curl going.
        Ok(data.len())
    }

    /// Also called while no data arrives, so a stalled transfer still sees a cancel.
    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        if self.task.control().is_cancelled() {
            if self.failure.is_none() {
                self.failure = Some(FetchError::Cancelled);
            }
            return false;
        }
        true
    }
}

/// Run one GET through a [`TransferSink`] and return the number of bytes it
/// accepted. The sink (and any file it owns) is dropped before returning.
pub(crate) fn perform(
    url: &str,
    opts: &CurlOptions,
    range: Option<&str>,
    sink: TransferSink,
) -> Result<u64, FetchError> {
    let mut easy = http::new_easy2(url, opts, sink)?;
    easy.progress(true)?;
    if let Some(r) = range {
        easy.range(r)?;
    }
    let performed = easy.perform();
    if let Some(failure) = easy.get_mut().failure.take() {
        return Err(failure);
    }
    performed?;
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    let sink = easy.get_ref();
    match sink.limit {
        Some(limit) if sink.written != limit => Err(FetchError::PartialTransfer {
            expected: limit,
            received: sink.written,
        }),
        _ => Ok(sink.written),
    }
}
