//! Manifest parsing and segment reference resolution.

/// Segment URLs listed by `body`, in playlist order.
///
/// Lines are trimmed; blank lines and `#` lines (tags and comments) are
/// skipped. Every other line is a segment reference, resolved against
/// `manifest_url` when it is not already absolute.
pub fn parse_manifest(manifest_url: &str, body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| resolve_reference(manifest_url, line))
        .collect()
}

/// Resolve one segment reference.
///
/// Absolute URLs are returned unchanged. A root-relative reference (`/a/b.ts`)
/// replaces the manifest's path. Anything else is appended to the manifest
/// URL up to and including the last `/` of its path.
pub fn resolve_reference(manifest_url: &str, reference: &str) -> String {
    if url::Url::parse(reference).is_ok() {
        return reference.to_string();
    }
    if reference.starts_with('/') {
        if let Ok(joined) = url::Url::parse(manifest_url).and_then(|base| base.join(reference)) {
            return joined.into();
        }
    }
    let base = manifest_url
        .split(['?', '#'])
        .next()
        .unwrap_or(manifest_url);
    match base.rfind('/') {
        Some(i) => format!("{}{}", &base[..=i], reference),
        None => reference.to_string(),
    }
}

/// File name for segment `index` of `total`: zero padded to at least five
/// digits so lexical order equals playlist order.
pub fn segment_file_name(index: usize, total: usize) -> String {
    let digits = total.saturating_sub(1).to_string().len();
    let width = digits.max(5);
    format!("{index:0width$}.ts")
}
