//! HTTP HEAD / metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers and confirm
//! `Content-Length` and `Accept-Ranges: bytes` before a ranged download.

use anyhow::{Context, Result};

use crate::error::DownloadError;
use crate::http::{self, CurlOptions};

/// Result of a HEAD request: the headers that decide between ranged and single-stream download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects; only the headers of the final response are parsed.
/// A non-2xx status is an error.
pub fn probe(url: &str, opts: &CurlOptions) -> Result<HeadResult> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = http::new_easy(url, opts).map_err(DownloadError::Transport)?;
    easy.nobody(true)?; // HEAD request

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            http::push_header_line(&mut headers, data);
            true
        })?;
        transfer
            .perform()
            .map_err(DownloadError::Transport)
            .context("HEAD request failed")?;
    }

    http::check_status(&mut easy, url)?;

    Ok(parse_headers(&headers))
}

/// Parse collected header lines into HeadResult.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut content_length = None;
    let mut accept_ranges = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }

    HeadResult {
        content_length,
        accept_ranges,
    }
}
