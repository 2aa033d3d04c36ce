//! Temporary directory holding segment files until they are merged.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DownloadError;

/// Sibling of the destination named `.tmp_<nanos>_<file name>`. Removed with
/// everything in it when dropped.
#[derive(Debug)]
pub(super) struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub(super) fn create(dest: &Path) -> Result<Self, DownloadError> {
        let path = work_dir_path(dest, SystemTime::now());
        fs::create_dir_all(&path).map_err(|e| DownloadError::filesystem(&path, e))?;
        tracing::debug!(dir = %path.display(), "segment work dir created");
        Ok(Self { path })
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(dir = %self.path.display(), "segment work dir removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %self.path.display(), error = %e, "could not remove work dir"),
        }
    }
}

fn work_dir_path(dest: &Path, now: SystemTime) -> PathBuf {
    let nanos = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos());
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.join(format!(".tmp_{nanos}_{name}"))
}
