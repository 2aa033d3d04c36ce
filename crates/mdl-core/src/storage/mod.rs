//! Destination file I/O.
//!
//! Creates (or truncates) the destination file, preallocates it (fallocate on
//! Linux when available, else set_len), and supports concurrent positioned
//! writes (pwrite on Unix, seek_write on Windows) from range workers that own
//! disjoint byte ranges. Other targets are not supported.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

use std::path::Path;

use crate::error::DownloadError;

/// Creates the parent directory tree of `path` if it does not exist.
pub fn ensure_parent_dir(path: &Path) -> Result<(), DownloadError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| DownloadError::filesystem(dir, e))
        }
        _ => Ok(()),
    }
}
