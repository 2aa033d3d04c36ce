//! Destination paths for `mdl get`.

use anyhow::{bail, Result};
use mdl_core::scheduler::is_manifest_url;
use std::path::{Path, PathBuf};

/// File name for `url`: last path segment with path-hostile characters
/// replaced. Playlists are saved as `.ts`, the container their segments use.
pub(crate) fn file_name_for(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let last = match after_scheme.split_once('/') {
        Some((_, path)) => path.rsplit('/').next().unwrap_or(""),
        None => "",
    };
    let mut name = sanitize(last);
    if name.is_empty() || name == "." || name == ".." {
        name = "download".to_string();
    }
    if is_manifest_url(url) {
        let stem = match name.rfind('.') {
            Some(i) if i > 0 => &name[..i],
            _ => name.as_str(),
        };
        name = format!("{stem}.ts");
    }
    name
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Pair every URL with its destination.
///
/// With one URL, `output` names the file unless it is an existing directory.
/// With several URLs, `output` must be a directory; files are named after
/// their URLs. Without `output`, files go to `cwd`.
pub(crate) fn plan_targets(
    urls: &[String],
    output: Option<&Path>,
    cwd: &Path,
) -> Result<Vec<(String, PathBuf)>> {
    if let [url] = urls {
        if let Some(out) = output {
            if !out.is_dir() {
                return Ok(vec![(url.clone(), out.to_path_buf())]);
            }
        }
    } else if let Some(out) = output {
        if out.exists() && !out.is_dir() {
            bail!("{} is not a directory", out.display());
        }
    }
    let dir = output.unwrap_or(cwd);
    let mut targets: Vec<(String, PathBuf)> = Vec::with_capacity(urls.len());
    for url in urls {
        let mut dest = dir.join(file_name_for(url));
        let mut n = 1;
        while targets.iter().any(|(_, d)| *d == dest) {
            dest = dir.join(format!("{}-{}", n, file_name_for(url)));
            n += 1;
        }
        targets.push((url.clone(), dest));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_url_path() {
        assert_eq!(file_name_for("https://cdn.example/v/movie.mp4?sig=abc"), "movie.mp4");
        assert_eq!(file_name_for("https://cdn.example/"), "download");
        assert_eq!(file_name_for("https://cdn.example"), "download");
        assert_eq!(file_name_for("https://h/a/b%20c|d.mp4"), "b%20c_d.mp4");
    }

    #[test]
    fn playlist_saved_as_ts() {
        assert_eq!(file_name_for("https://h/live/index.m3u8"), "index.ts");
        assert_eq!(file_name_for("https://h/live/INDEX.M3U8?t=1"), "INDEX.ts");
    }

    #[test]
    fn single_url_with_file_output() {
        let cwd = Path::new("/work");
        let urls = vec!["https://h/a.mp4".to_string()];
        let t = plan_targets(&urls, Some(Path::new("/nonexistent-mdl/out.mp4")), cwd).unwrap();
        assert_eq!(t[0].1, Path::new("/nonexistent-mdl/out.mp4"));
        let t = plan_targets(&urls, None, cwd).unwrap();
        assert_eq!(t[0].1, Path::new("/work/a.mp4"));
    }

    #[test]
    fn several_urls_into_directory_without_clashes() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec![
            "https://h/x/clip.mp4".to_string(),
            "https://h/y/clip.mp4".to_string(),
            "https://h/z/index.m3u8".to_string(),
        ];
        let t = plan_targets(&urls, Some(dir.path()), Path::new("/unused")).unwrap();
        assert_eq!(t[0].1, dir.path().join("clip.mp4"));
        assert_eq!(t[1].1, dir.path().join("1-clip.mp4"));
        assert_eq!(t[2].1, dir.path().join("index.ts"));
    }

    #[test]
    fn several_urls_need_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.bin");
        std::fs::write(&file, b"x").unwrap();
        let urls = vec!["https://h/a".to_string(), "https://h/b".to_string()];
        assert!(plan_targets(&urls, Some(&file), Path::new("/")).is_err());
    }
}
