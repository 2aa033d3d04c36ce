//! Fetcher selection by URL shape.

use crate::task::TransferKind;

/// True if `url` names a chunked playlist (`.m3u8`, any case).
pub fn is_manifest_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains(".m3u8")
}

/// Transfer kind for a newly registered task. Sizes are filled in later.
pub(crate) fn transfer_kind_for(url: &str) -> TransferKind {
    if is_manifest_url(url) {
        TransferKind::Segmented {
            segment_count: None,
        }
    } else {
        TransferKind::WholeFile { size: None }
    }
}
