//! Byte-range planning for whole-file transfers.

/// A contiguous byte range `[start, end)` of the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ByteRange {
    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the last byte (inclusive upper bound).
    pub fn last_byte(&self) -> u64 {
        self.end.saturating_sub(1)
    }

    /// Range string as libcurl expects it: `"start-last"`, both inclusive.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.last_byte())
    }
}

/// Splits `[0, total_size)` into `parts` contiguous ranges.
///
/// Every range gets `total_size / parts` bytes and the last one absorbs the
/// remainder. `parts` is capped at `total_size` so no range is empty. Returns
/// an empty vec if `total_size` or `parts` is 0.
pub fn plan_ranges(total_size: u64, parts: usize) -> Vec<ByteRange> {
    if total_size == 0 || parts == 0 {
        return Vec::new();
    }

    let parts = (parts as u64).min(total_size);
    let base = total_size / parts;

    (0..parts)
        .map(|i| {
            let start = i * base;
            let end = if i == parts - 1 { total_size } else { start + base };
            ByteRange { start, end }
        })
        .collect()
}
