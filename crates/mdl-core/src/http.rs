//! libcurl handle setup shared by every request the engine makes.

use anyhow::{Context, Result};
use std::str;
use std::time::Duration;

use crate::config::MdlConfig;
use crate::error::DownloadError;

/// Per-request options applied to every `curl::easy::Easy` handle.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

impl From<&MdlConfig> for CurlOptions {
    fn from(cfg: &MdlConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// New easy handle for `url` with redirects followed and no overall timeout.
///
/// No low-speed limit is set: a paused worker keeps its connection open and
/// idle, which libcurl would otherwise treat as a stalled transfer.
pub fn new_easy(url: &str, opts: &CurlOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua)?;
    }
    Ok(easy)
}

/// Same setup as [`new_easy`] for a handler-driven `Easy2`.
pub fn new_easy2<H: curl::easy::Handler>(
    url: &str,
    opts: &CurlOptions,
    handler: H,
) -> Result<curl::easy::Easy2<H>, curl::Error> {
    let mut easy = curl::easy::Easy2::new(handler);
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua)?;
    }
    Ok(easy)
}

/// Checks the final response code of a finished transfer.
pub fn check_status(easy: &mut curl::easy::Easy, url: &str) -> Result<u32> {
    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            code,
        }
        .into());
    }
    Ok(code)
}

/// GET `url` and return the body as text (lossy UTF-8).
pub fn fetch_text(url: &str, opts: &CurlOptions) -> Result<String> {
    let mut body = Vec::new();
    let mut easy = new_easy(url, opts).map_err(DownloadError::Transport)?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer
            .perform()
            .map_err(DownloadError::Transport)
            .with_context(|| format!("GET {}", url))?;
    }
    check_status(&mut easy, url)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Collects header lines of the last response, dropping those of earlier
/// redirect hops (a new status line starts a new block).
pub(crate) fn push_header_line(lines: &mut Vec<String>, data: &[u8]) {
    if let Ok(s) = str::from_utf8(data) {
        let line = s.trim_end();
        if line.starts_with("HTTP/") {
            lines.clear();
        }
        lines.push(line.to_string());
    }
}

/// Status code from the first line of a header block (`HTTP/1.1 206 Partial Content`).
pub(crate) fn parse_http_status(lines: &[String]) -> Option<u32> {
    let line = lines.first()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
