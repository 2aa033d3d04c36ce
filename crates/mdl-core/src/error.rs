//! Engine error taxonomy: transport, protocol and filesystem failures.

use std::path::PathBuf;

/// Typed failure reasons surfaced by the fetchers.
///
/// Fetchers return `anyhow::Error` with these wrapped inside, so callers can
/// `downcast_ref::<DownloadError>()` when they need to branch on the kind.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Connection, DNS, timeout or read failure reported by libcurl.
    #[error("transport error: {0}")]
    Transport(#[from] curl::Error),

    #[error("{url} returned HTTP {code}")]
    HttpStatus { url: String, code: u32 },

    /// Server advertised byte ranges but sent no usable length.
    #[error("Content-Length not provided")]
    MissingContentLength,

    #[error("remote resource is empty")]
    EmptyResource,

    #[error("manifest lists no segments")]
    EmptyManifest,

    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The task was cancelled while the fetcher was running.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// True if `err` (or anything in its chain) is a cancellation.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(e.downcast_ref::<DownloadError>(), Some(DownloadError::Cancelled))
            || matches!(
                e.downcast_ref::<crate::retry::FetchError>(),
                Some(crate::retry::FetchError::Cancelled)
            )
    })
}
