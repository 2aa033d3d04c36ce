//! Ordered concatenation of segment files into the destination.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::DownloadError;

/// Segment files in `dir`, sorted by name.
fn segment_files(dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let entries = fs::read_dir(dir).map_err(|e| DownloadError::filesystem(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DownloadError::filesystem(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ts") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Concatenate every segment file in `dir` into `dest` (created or
/// truncated) in file-name order and sync it. Returns the size on disk.
pub(super) fn merge_segments(dir: &Path, dest: &Path) -> Result<u64, DownloadError> {
    let files = segment_files(dir)?;
    let out = File::create(dest).map_err(|e| DownloadError::filesystem(dest, e))?;
    let mut writer = BufWriter::new(out);
    for path in &files {
        let mut segment = File::open(path).map_err(|e| DownloadError::filesystem(path, e))?;
        io::copy(&mut segment, &mut writer).map_err(|e| DownloadError::filesystem(dest, e))?;
    }
    writer.flush().map_err(|e| DownloadError::filesystem(dest, e))?;
    let out = writer
        .into_inner()
        .map_err(|e| DownloadError::filesystem(dest, e.into_error()))?;
    out.sync_all().map_err(|e| DownloadError::filesystem(dest, e))?;
    let size = out
        .metadata()
        .map_err(|e| DownloadError::filesystem(dest, e))?
        .len();
    tracing::info!(dest = %dest.display(), segments = files.len(), bytes = size, "segments merged");
    Ok(size)
}
