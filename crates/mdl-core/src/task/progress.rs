//! Progress callback contract.

use std::sync::Arc;

/// Value reported in place of an unknown or meaningless byte figure.
pub const UNKNOWN: i64 = -1;

/// One progress report: percent in `[0, 100]`, a display label, and byte figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub percent: f64,
    pub label: String,
    /// Bytes received so far; `None` when not meaningful for this report.
    pub current_bytes: Option<u64>,
    /// Total bytes; `None` while unknown.
    pub total_bytes: Option<u64>,
}

impl ProgressEvent {
    pub fn new(
        percent: f64,
        label: impl Into<String>,
        current_bytes: Option<u64>,
        total_bytes: Option<u64>,
    ) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
            label: label.into(),
            current_bytes,
            total_bytes,
        }
    }

    /// `current_bytes` with [`UNKNOWN`] for `None`.
    pub fn current_or_unknown(&self) -> i64 {
        self.current_bytes.map_or(UNKNOWN, |b| b as i64)
    }

    /// `total_bytes` with [`UNKNOWN`] for `None`.
    pub fn total_or_unknown(&self) -> i64 {
        self.total_bytes.map_or(UNKNOWN, |b| b as i64)
    }
}

/// Callback invoked from fetcher and sampler threads.
pub type ProgressFn = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
