//! Builder for creating and preallocating destination files.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::writer::StorageWriter;
use crate::error::DownloadError;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Builder for a destination file. Call `preallocate` then `build` to get
/// a `StorageWriter` that supports concurrent `write_at` from multiple workers.
pub struct StorageWriterBuilder {
    file: File,
    path: PathBuf,
}

impl StorageWriterBuilder {
    /// Create the file at `path`. Overwrites if the path already exists.
    pub fn create(path: &Path) -> Result<Self, DownloadError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| DownloadError::filesystem(path, e))?;
        Ok(StorageWriterBuilder {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` for real block
    /// allocation; falls back to `set_len` on failure or non-Unix.
    pub fn preallocate(&mut self, size: u64) -> Result<(), DownloadError> {
        #[cfg(unix)]
        {
            if let Ok(len) = libc::off_t::try_from(size) {
                let fd = self.file.as_raw_fd();
                // SAFETY: `fd` belongs to `self.file`, which is open for writing and outlives the call.
                let r = unsafe { libc::posix_fallocate(fd, 0, len) };
                if r == 0 {
                    return Ok(());
                }
                tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
            }
        }
        self.file
            .set_len(size)
            .map_err(|e| DownloadError::filesystem(&self.path, e))
    }

    /// Finish building and return a writer that can be shared for concurrent writes.
    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.path)
    }
}
