//! Concurrent offset writer for destination files.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

use crate::error::DownloadError;

/// Writer for a destination file. Safe to clone and use from multiple workers;
/// each `write_at` carries its own offset and never touches a shared cursor.
#[derive(Debug, Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    path: PathBuf,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            path,
        }
    }

    /// Write all of `data` at `offset` (pwrite). Safe for concurrent use.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Write all of `data` at `offset` with positioned `WriteFile` calls.
    /// Safe for concurrent use on disjoint ranges.
    #[cfg(windows)]
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.file.seek_write(data, offset) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    data = &data[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sync file data to disk.
    pub fn sync(&self) -> Result<(), DownloadError> {
        self.file
            .sync_all()
            .map_err(|e| DownloadError::filesystem(&self.path, e))
    }
}
